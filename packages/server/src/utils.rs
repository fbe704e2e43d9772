pub mod test_setup;
pub mod test_transport;
pub mod websocket;
