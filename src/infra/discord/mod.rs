// Discord HTTP implementations of the core registration port.

mod registration_client;

pub use registration_client::DiscordRegistrationApi;
