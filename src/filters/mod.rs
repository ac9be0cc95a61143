pub mod speed_kalman;
pub mod validator;

pub use speed_kalman::{EstimatorState, SpeedEstimator, SpeedProposal, SpeedSource};
pub use validator::{FixValidator, RejectReason, Verdict};
