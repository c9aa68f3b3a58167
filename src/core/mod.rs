pub mod dispatcher;
pub mod handlers;
pub mod routing_table;

pub use dispatcher::{Dispatcher, request_host};
pub use handlers::{RouteEntry, RouteKind};
pub use routing_table::{RegistrationError, RoutingTable, RoutingTableBuilder};
