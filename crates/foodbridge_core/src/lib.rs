pub mod domain;
pub mod gate;
pub mod lifecycle;
pub mod ports;

pub use domain::{
    AppRole, AuthSession, ContactMessage, Donation, DonationCounts, DonationStatus, MessageStatus,
    NewDonation, Profile, User, UserAccount, UserCredentials,
};
pub use gate::{authorize, GateDecision, SessionState};
pub use lifecycle::{apply, Transition, TransitionError};
pub use ports::{ChangeEvent, ChangeOp, DatabaseService, PortError, PortResult, StoreTable};
