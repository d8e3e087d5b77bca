//! Tickets, their master data and report records.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTicketRepository;
pub use store::{RepositoryError, TicketRepository};
pub use types::{
    Client, ClientDetails, DeliveryMethod, Handler, InvalidTransition, NewTicket, Priority,
    Project, ProjectDetails, Report, Ticket, TicketStatus, TicketUpdate, TicketView,
    UnknownVariant,
};
