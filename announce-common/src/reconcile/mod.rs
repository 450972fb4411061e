//! Idempotent batch jobs deriving audiences and memberships from host data
//!
//! Both jobs can be re-run at any time: a second run over unchanged host data
//! writes nothing.

pub mod audiences;
pub mod profiles;

pub use audiences::{generate_audiences, plan_audiences, AudiencePlan, AudienceReport};
pub use profiles::{generate_profiles, ProfileOutcome, ProfileReport};
