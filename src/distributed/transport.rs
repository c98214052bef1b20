use crate::error::{check_len, AssemblyError};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::time::Duration;

/// Distinguishes independent message streams between the same pair of partitions.
pub type Tag = u32;

pub const PTAP_ROWS_TAG: Tag = 1;
pub const COMM_PKG_TAG: Tag = 2;
pub const ESSENTIAL_MARKERS_TAG: Tag = 3;
pub const IDENTITY_PROLONGATION_TAG: Tag = 4;

/// Point-to-point message passing between the partitions of a distributed operator.
///
/// Messages sent from one partition to another with the same tag are received in the order in
/// which they were sent. Sending never blocks; receiving blocks until a matching message arrives.
pub trait Transport {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn send<M: Send + 'static>(&self, dest: usize, tag: Tag, message: M) -> Result<(), AssemblyError>;

    fn receive<M: Send + 'static>(&self, source: usize, tag: Tag) -> Result<M, AssemblyError>;

    /// Sends all outgoing messages, then receives one message from each of the given sources.
    fn exchange<M: Send + 'static>(
        &self,
        tag: Tag,
        outgoing: Vec<(usize, M)>,
        sources: &[usize],
    ) -> Result<Vec<M>, AssemblyError> {
        for (dest, message) in outgoing {
            self.send(dest, tag, message)?;
        }
        sources.iter().map(|&source| self.receive(source, tag)).collect()
    }

    /// Sends `outgoing[p]` to every partition `p` (including this one) and returns the messages
    /// received from every partition, ordered by source.
    fn all_to_all<M: Send + 'static>(&self, tag: Tag, outgoing: Vec<M>) -> Result<Vec<M>, AssemblyError> {
        check_len("all-to-all messages", self.size(), outgoing.len())?;
        let sources: Vec<usize> = (0..self.size()).collect();
        self.exchange(tag, outgoing.into_iter().enumerate().collect(), &sources)
    }
}

struct Envelope {
    source: usize,
    tag: Tag,
    payload: Box<dyn Any + Send>,
}

fn open<M: 'static>(envelope: Envelope) -> Result<M, AssemblyError> {
    let (source, tag) = (envelope.source, envelope.tag);
    envelope.payload.downcast::<M>().map(|boxed| *boxed).map_err(|_| {
        AssemblyError::Transport(format!(
            "message with tag {} from rank {} has an unexpected payload type",
            tag, source
        ))
    })
}

/// Messages that arrived before they were asked for.
#[derive(Default)]
struct Mailbox {
    pending: Mutex<Vec<Envelope>>,
}

impl Mailbox {
    fn take(&self, source: usize, tag: Tag) -> Option<Envelope> {
        let mut pending = self.pending.lock();
        let idx = pending
            .iter()
            .position(|envelope| envelope.source == source && envelope.tag == tag)?;
        Some(pending.remove(idx))
    }

    fn put(&self, envelope: Envelope) {
        self.pending.lock().push(envelope);
    }
}

/// The transport of a distributed computation with a single partition.
///
/// Messages can only be sent to the partition itself.
#[derive(Default)]
pub struct SerialTransport {
    mailbox: Mailbox,
}

impl SerialTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport").finish()
    }
}

impl Transport for SerialTransport {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send<M: Send + 'static>(&self, dest: usize, tag: Tag, message: M) -> Result<(), AssemblyError> {
        if dest != 0 {
            return Err(AssemblyError::Transport(format!(
                "cannot send to rank {} from a serial transport",
                dest
            )));
        }
        self.mailbox.put(Envelope {
            source: 0,
            tag,
            payload: Box::new(message),
        });
        Ok(())
    }

    fn receive<M: Send + 'static>(&self, source: usize, tag: Tag) -> Result<M, AssemblyError> {
        let envelope = self.mailbox.take(source, tag).ok_or_else(|| {
            AssemblyError::Transport(format!(
                "no message with tag {} from rank {} was sent to the serial transport",
                tag, source
            ))
        })?;
        open(envelope)
    }
}

/// An in-process group of partitions connected by channels.
///
/// Every ordered pair of distinct partitions has its own channel, and messages to the partition
/// itself go straight into its mailbox. Dropping a partition disconnects it from its peers, so a
/// partition waiting for a message from a dropped peer fails instead of blocking.
///
/// Every partition is expected to run on its own thread. See [`LocalTransport::group`].
pub struct LocalTransport {
    rank: usize,
    /// Indexed by destination, `None` for this partition.
    senders: Vec<Option<Sender<Envelope>>>,
    /// Indexed by source, `None` for this partition.
    receivers: Vec<Option<Receiver<Envelope>>>,
    mailbox: Mailbox,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("rank", &self.rank)
            .field("size", &self.senders.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LocalTransport {
    /// Creates a fully connected group of `size` partitions, indexed by rank.
    pub fn group(size: usize) -> Vec<Self> {
        let mut senders: Vec<Vec<Option<Sender<Envelope>>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        for source in 0..size {
            for dest in 0..size {
                if source == dest {
                    senders[source].push(None);
                    receivers[dest].push(None);
                } else {
                    let (sender, receiver) = unbounded();
                    senders[source].push(Some(sender));
                    receivers[dest].push(Some(receiver));
                }
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| Self {
                rank,
                senders,
                receivers,
                mailbox: Mailbox::default(),
                timeout: None,
            })
            .collect()
    }

    /// Makes `receive` fail instead of waiting longer than `timeout` for a message.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    fn next_envelope(&self, source: usize, receiver: &Receiver<Envelope>) -> Result<Envelope, AssemblyError> {
        match self.timeout {
            Some(timeout) => receiver.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => AssemblyError::Transport(format!(
                    "rank {} timed out waiting for a message from rank {}",
                    self.rank, source
                )),
                RecvTimeoutError::Disconnected => self.disconnected(source),
            }),
            None => receiver.recv().map_err(|_| self.disconnected(source)),
        }
    }

    fn disconnected(&self, peer: usize) -> AssemblyError {
        AssemblyError::Transport(format!("rank {} disconnected from rank {}", peer, self.rank))
    }

    fn invalid_rank(&self, rank: usize) -> AssemblyError {
        AssemblyError::Transport(format!("rank {} is not part of a group of size {}", rank, self.size()))
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn send<M: Send + 'static>(&self, dest: usize, tag: Tag, message: M) -> Result<(), AssemblyError> {
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload: Box::new(message),
        };
        match self.senders.get(dest) {
            None => Err(self.invalid_rank(dest)),
            Some(None) => {
                self.mailbox.put(envelope);
                Ok(())
            }
            Some(Some(sender)) => sender.send(envelope).map_err(|_| self.disconnected(dest)),
        }
    }

    fn receive<M: Send + 'static>(&self, source: usize, tag: Tag) -> Result<M, AssemblyError> {
        if let Some(envelope) = self.mailbox.take(source, tag) {
            return open(envelope);
        }
        let receiver = match self.receivers.get(source) {
            None => return Err(self.invalid_rank(source)),
            Some(None) => {
                return Err(AssemblyError::Transport(format!(
                    "no message with tag {} was sent by rank {} to itself",
                    tag, source
                )))
            }
            Some(Some(receiver)) => receiver,
        };
        loop {
            let envelope = self.next_envelope(source, receiver)?;
            if envelope.tag == tag {
                return open(envelope);
            }
            self.mailbox.put(envelope);
        }
    }
}
