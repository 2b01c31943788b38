use core::fmt::{self, Debug};
use std::collections::BTreeSet;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Certificate and private key issued by a CA. Key material is opaque to the
/// coordinator; it is only handed to the network layer for signing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub certificate: String,
    pub key: Vec<u8>,
}

impl Debug for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enrollment")
            .field("certificate", &self.certificate)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Signing identity an operation runs under. Treated as fixed for the whole
/// propose/submit pair; callers share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub msp_id: String,
    pub organization: String,
    pub affiliation: Option<String>,
    pub account: Option<String>,
    pub roles: BTreeSet<String>,
    pub enrollment: Option<Enrollment>,
    #[serde(skip)]
    pub enrollment_secret: Option<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            msp_id: String::new(),
            organization: organization.into(),
            affiliation: None,
            account: None,
            roles: Default::default(),
            enrollment: None,
            enrollment_secret: None,
        }
    }

    pub fn with_msp_id(mut self, msp_id: impl Into<String>) -> Self {
        self.msp_id = msp_id.into();
        self
    }

    pub fn with_enrollment(mut self, enrollment: Enrollment) -> Self {
        self.enrollment = Some(enrollment);
        self
    }

    /// The serialized creator (MSP id plus certificate) that transaction ids
    /// are derived from. Fails if the identity was never enrolled.
    pub fn creator_bytes(&self) -> Result<Vec<u8>> {
        let enrollment = self.enrollment.as_ref().ok_or_else(|| {
            Error::ConfigurationFault(format!("identity `{}` has no enrollment", self.name))
        })?;
        if self.msp_id.is_empty() {
            return Err(Error::ConfigurationFault(format!(
                "identity `{}` has no MSP id",
                self.name
            )));
        }
        Ok(bincode::serialize(&(&self.msp_id, &enrollment.certificate))?)
    }
}

/// A request to register a new user with a CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub affiliation: String,
}

/// Enrollment/CA service. Lives outside the coordinator; it is only used to
/// produce the `Identity` that gets passed in.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    async fn enroll(&self, name: &str, secret: &str) -> Result<Enrollment>;

    /// Registers a user on behalf of `registrar`, returning the enrollment secret.
    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &Identity,
    ) -> Result<String>;
}

/// Enrolls the organisation admin, registers `user_name` under `affiliation`
/// and enrolls it, returning the fully enrolled user identity.
pub async fn enroll_user<CA: CertificateAuthority + ?Sized>(
    ca: &CA,
    admin: Identity,
    admin_secret: &str,
    user_name: &str,
    affiliation: &str,
    msp_id: &str,
) -> Result<Identity> {
    info!("[CA] enrolling admin {}", admin.name);
    let admin_enrollment = ca.enroll(&admin.name, admin_secret).await?;
    let admin = admin.with_enrollment(admin_enrollment);

    let request = RegistrationRequest {
        name: user_name.to_string(),
        affiliation: affiliation.to_string(),
    };
    let secret = ca.register(&request, &admin).await?;
    info!("[CA] registered {user_name} under {affiliation}");

    let enrollment = ca.enroll(user_name, &secret).await?;
    let mut user = Identity::new(user_name, admin.organization.clone())
        .with_msp_id(msp_id)
        .with_enrollment(enrollment);
    user.affiliation = Some(affiliation.to_string());
    user.enrollment_secret = Some(secret);
    Ok(user)
}
