mod cycle_repository;
mod group_repository;
mod participation_repository;
mod post_repository;
mod profile_repository;
mod user_repository;
mod vote_repository;

pub use cycle_repository::CycleRepository;
pub use group_repository::GroupRepository;
pub use participation_repository::ParticipationRepository;
pub use post_repository::PostRepository;
pub use profile_repository::ProfileRepository;
pub use user_repository::UserRepository;
pub use vote_repository::{ToggleOutcome, VoteRepository};
