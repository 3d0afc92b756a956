//! HTTP clients for the services BeautyLink talks to besides its database:
//! the marketplace REST API (direct chats) and a Nominatim geocoder.

pub mod chat;
pub mod error;
pub mod geocode;
mod http;

pub use chat::{ApiClient, DirectChat, DirectChatRequest};
pub use error::RemoteError;
pub use geocode::{GeocodeClient, GeocodeResult};
