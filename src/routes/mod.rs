pub mod admin;

pub mod announcements;

pub mod auth;

pub mod courses;

pub mod credits;

pub mod materials;

pub mod progress;

pub mod submissions;

pub mod system;

pub mod tickets;

pub use admin::configure_admin_routes;
pub use announcements::configure_announcements_routes;
pub use auth::configure_auth_routes;
pub use courses::configure_courses_routes;
pub use credits::configure_credits_routes;
pub use progress::configure_progress_routes;
pub use submissions::configure_submissions_routes;
pub use system::configure_system_routes;
pub use tickets::configure_tickets_routes;
