use crate::domain::user::driving_ports::CreateUserError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use thiserror::Error;
use tracing::{error, info};

/// The owner of tasks, todos, and stats
#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

#[cfg_attr(test, derive(Clone, Debug))]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
}

impl CreateUser {
    /// The same registration with surrounding whitespace stripped from both names, so " Ada" and
    /// "Ada" count as the same person
    pub fn trimmed(&self) -> CreateUser {
        CreateUser {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
        }
    }

    fn full_name(&self) -> driven_ports::FullName<'_> {
        driven_ports::FullName {
            first: &self.first_name,
            last: &self.last_name,
        }
    }
}

pub mod driven_ports {
    use super::*;

    pub trait UserReader: Sync {
        async fn get_all(&self, ext_cxn: &mut impl ExternalConnectivity) -> Result<Vec<User>, anyhow::Error>;
    }

    pub trait UserWriter: Sync {
        async fn create_user(
            &self,
            user: &CreateUser,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;
    }

    /// A first and last name pair, which identifies a user as uniquely as their ID does
    #[derive(Debug, Clone, Copy)]
    pub struct FullName<'names> {
        pub first: &'names str,
        pub last: &'names str,
    }

    pub trait DetectUser: Sync {
        async fn user_exists(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        async fn name_taken(
            &self,
            name: FullName<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum CreateUserError {
        #[error("A user with that name is already registered.")]
        UserAlreadyExists,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    pub trait UserPort {
        async fn get_users(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
        ) -> Result<Vec<User>, anyhow::Error>;
        async fn create_user(
            &self,
            new_user: &CreateUser,
            ext_cxn: &mut impl ExternalConnectivity,
            u_writer: &impl driven_ports::UserWriter,
            u_detect: &impl driven_ports::DetectUser,
        ) -> Result<i32, CreateUserError>;
    }
}

pub struct UserService;

/// Why the user a task, todo, or stats request is scoped to couldn't be confirmed.
/// Each service converts this into its own error type.
#[derive(Debug, Error)]
pub(super) enum OwnerLookupError {
    #[error("user with ID {0} does not exist")]
    UserDoesNotExist(i32),

    #[error(transparent)]
    PortError(#[from] anyhow::Error),
}

/// Gate in front of every user-scoped operation
pub(super) async fn ensure_owner_exists(
    owner_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    u_detect: &impl driven_ports::DetectUser,
) -> Result<(), OwnerLookupError> {
    if u_detect.user_exists(owner_id, ext_cxn).await? {
        return Ok(());
    }

    Err(OwnerLookupError::UserDoesNotExist(owner_id))
}

impl driving_ports::UserPort for UserService {
    async fn get_users(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
    ) -> Result<Vec<User>, anyhow::Error> {
        u_reader
            .get_all(ext_cxn)
            .await
            .inspect_err(|port_err| error!("Could not list users: {port_err}"))
            .context("Listing registered users")
    }

    async fn create_user(
        &self,
        new_user: &CreateUser,
        ext_cxn: &mut impl ExternalConnectivity,
        u_writer: &impl driven_ports::UserWriter,
        u_detect: &impl driven_ports::DetectUser,
    ) -> Result<i32, CreateUserError> {
        let registration = new_user.trimmed();

        let taken = u_detect
            .name_taken(registration.full_name(), &mut *ext_cxn)
            .await
            .context("Checking for a user with the same name")?;
        if taken {
            info!(
                "Rejected duplicate registration for {} {}",
                registration.first_name, registration.last_name
            );
            return Err(CreateUserError::UserAlreadyExists);
        }

        let new_id = u_writer
            .create_user(&registration, &mut *ext_cxn)
            .await
            .context("Registering user")?;

        Ok(new_id)
    }
}
