//! HTTP boundary to the SafeRound backend.
//!
//! | Endpoint | Client |
//! |---|---|
//! | `POST /validate-drink` | [`ValidationClient`] |
//! | `POST /sobriety/assess` | [`AssessmentClient`] |
//! | `POST /groups`, `POST /groups/join`, `GET /groups/{id}/members` | [`GroupClient`] |

pub mod assessment;
pub mod client;
pub mod groups;
pub mod traits;
pub mod validation;

pub use assessment::AssessmentClient;
pub use client::ApiClient;
pub use groups::{Group, GroupClient, JoinCode, Member};
pub use traits::{AssessmentService, DrinkValidator};
pub use validation::{RejectionNotice, ValidationClient, ValidationOutcome, ValidationReason};
