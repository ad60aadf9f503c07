// ABOUTME: Command module aggregator for the devforge CLI.
// ABOUTME: Re-exports the provision, deploy, apps, and sync command handlers.

mod apps;
mod deploy;
mod provision;
mod sync;

pub use apps::apps;
pub use deploy::deploy;
pub use provision::provision;
pub use sync::sync;
