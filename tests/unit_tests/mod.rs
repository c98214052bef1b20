mod assembly;
mod distributed;
mod kernel;
mod pattern;
