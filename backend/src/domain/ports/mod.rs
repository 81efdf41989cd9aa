//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod fanout;
mod notification_publisher;
mod user_repository;

#[cfg(test)]
pub use fanout::MockFanoutPublisher;
pub use fanout::{FanoutError, FanoutInbound, FanoutPublisher};
#[cfg(test)]
pub use notification_publisher::MockNotificationPublisher;
pub use notification_publisher::{
    NoOpNotificationPublisher, NotificationPublisher, NotificationPublisherError,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
