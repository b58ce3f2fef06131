//! Outbound side of the land grid: ledger call descriptors for the player
//! actions, the wallet and transport seams, and a text command front end.
//!
//! Builders validate against a [`land_core::LandGrid`] before producing
//! calls; nothing here signs or sends transactions by itself.

pub mod calls;
pub mod command_text;
pub mod session;

pub use calls::{CallError, CallTarget, LandCall, Listing};
pub use command_text::{
    parse_command_line, CommandError, CommandParseError, LandCommand, LocationArg, TokenArg,
};
pub use session::{
    DryRunSubmitter, SigningSession, StaticSession, SubmitError, TransactionHandle,
    TransactionSubmitter,
};
