//! Bus adapters: the outbound gateway implementation and the inbound
//! event dispatcher.

pub mod bus_gateway;
pub mod dispatcher;

pub use bus_gateway::BusGateway;
pub use dispatcher::EventDispatcher;
