pub mod demo;
pub mod init;
pub mod shuffle;

pub use demo::{demo, DemoArgs};
pub use init::{init, InitArgs};
pub use shuffle::{shuffle, ShuffleArgs};
