//! Instance listing and lifecycle management.

use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::domain::instance::{ConnectionStatus, Instance, IntegrationType};

use super::contracts::SourceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub integration: IntegrationType,
    /// Instance token; the server generates one when absent.
    pub token: Option<String>,
    /// Phone number, required by the Business integration.
    pub number: Option<String>,
}

/// What the server answers to a connect request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingChallenge {
    pub pairing_code: Option<String>,
    /// Raw QR payload.
    pub code: Option<String>,
    /// PNG rendering of the QR payload, base64, optionally as a data URL.
    pub qr_base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The instance is already logged in to WhatsApp.
    AlreadyConnected,
    AwaitingScan {
        qr_file: Option<PathBuf>,
        pairing_code: Option<String>,
    },
}

pub trait InstanceAdmin {
    fn fetch_instances(&self) -> Result<Vec<Instance>, SourceError>;
    fn create_instance(&self, request: &CreateInstanceRequest) -> Result<Instance, SourceError>;
    fn delete_instance(&self, instance: &str) -> Result<(), SourceError>;
    fn connect_instance(&self, instance: &str) -> Result<PairingChallenge, SourceError>;
    fn connection_state(&self, instance: &str) -> Result<ConnectionStatus, SourceError>;
    fn restart_instance(&self, instance: &str) -> Result<(), SourceError>;
    fn logout_instance(&self, instance: &str) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstanceError {
    #[error("invalid instance request: {0}")]
    InvalidRequest(&'static str),
    #[error("the server rejected the API key")]
    Unauthorized,
    #[error("instance not found")]
    NotFound,
    #[error("server temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("server sent an unexpected response")]
    DataContractViolation,
    #[error("{0}")]
    Rejected(String),
    #[error("QR code is not valid base64")]
    QrCodeInvalid,
    #[error("failed to write QR code to {path}: {details}")]
    QrCodeWrite { path: PathBuf, details: String },
}

/// All instances, sorted by name.
pub fn list_instances(admin: &dyn InstanceAdmin) -> Result<Vec<Instance>, InstanceError> {
    let mut instances = admin.fetch_instances().map_err(map_source_error)?;
    instances.sort_by_key(|instance| instance.name.to_lowercase());

    Ok(instances)
}

pub fn create_instance(
    admin: &dyn InstanceAdmin,
    mut request: CreateInstanceRequest,
) -> Result<Instance, InstanceError> {
    request.name = request.name.trim().to_owned();
    if request.name.is_empty() {
        return Err(InstanceError::InvalidRequest("instance name is empty"));
    }
    if request.name.contains('/') {
        return Err(InstanceError::InvalidRequest("instance name contains '/'"));
    }
    if request.integration == IntegrationType::Business
        && (request.token.is_none() || request.number.is_none())
    {
        return Err(InstanceError::InvalidRequest(
            "business instances need both a token and a number",
        ));
    }

    let instance = admin.create_instance(&request).map_err(map_source_error)?;
    tracing::info!(
        instance = %instance.name,
        integration = %instance.integration,
        "instance created"
    );

    Ok(instance)
}

pub fn delete_instance(admin: &dyn InstanceAdmin, instance: &str) -> Result<(), InstanceError> {
    admin.delete_instance(instance).map_err(map_source_error)?;
    tracing::info!(instance, "instance deleted");
    Ok(())
}

pub fn restart_instance(admin: &dyn InstanceAdmin, instance: &str) -> Result<(), InstanceError> {
    admin.restart_instance(instance).map_err(map_source_error)
}

pub fn logout_instance(admin: &dyn InstanceAdmin, instance: &str) -> Result<(), InstanceError> {
    admin.logout_instance(instance).map_err(map_source_error)?;
    tracing::info!(instance, "instance logged out of whatsapp");
    Ok(())
}

pub fn connection_state(
    admin: &dyn InstanceAdmin,
    instance: &str,
) -> Result<ConnectionStatus, InstanceError> {
    admin.connection_state(instance).map_err(map_source_error)
}

/// Requests a pairing challenge and writes its QR image to `qr_path`.
pub fn connect_instance(
    admin: &dyn InstanceAdmin,
    instance: &str,
    qr_path: &Path,
) -> Result<ConnectOutcome, InstanceError> {
    let challenge = admin.connect_instance(instance).map_err(map_source_error)?;

    let qr_file = match challenge.qr_base64.as_deref().filter(|qr| !qr.is_empty()) {
        Some(encoded) => {
            save_qr_code(encoded, qr_path)?;
            Some(qr_path.to_path_buf())
        }
        None => None,
    };

    if qr_file.is_none() && challenge.pairing_code.is_none() && challenge.code.is_none() {
        return Ok(ConnectOutcome::AlreadyConnected);
    }

    Ok(ConnectOutcome::AwaitingScan {
        qr_file,
        pairing_code: challenge.pairing_code,
    })
}

fn save_qr_code(encoded: &str, path: &Path) -> Result<(), InstanceError> {
    let payload = encoded
        .split_once(";base64,")
        .map_or(encoded, |(_, data)| data);
    let png = STANDARD
        .decode(payload.trim())
        .map_err(|_| InstanceError::QrCodeInvalid)?;

    let write_error = |source: std::io::Error| InstanceError::QrCodeWrite {
        path: path.to_path_buf(),
        details: source.to_string(),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, png).map_err(write_error)
}

fn map_source_error(error: SourceError) -> InstanceError {
    match error {
        SourceError::Unauthorized => InstanceError::Unauthorized,
        SourceError::NotFound => InstanceError::NotFound,
        SourceError::Unavailable => InstanceError::TemporarilyUnavailable,
        SourceError::InvalidData => InstanceError::DataContractViolation,
        SourceError::Rejected(message) => InstanceError::Rejected(message),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct StubAdmin {
        instances: Vec<Instance>,
        challenge: PairingChallenge,
        created: Mutex<Option<CreateInstanceRequest>>,
        failure: Option<SourceError>,
    }

    impl StubAdmin {
        fn result<T>(&self, value: T) -> Result<T, SourceError> {
            match &self.failure {
                Some(error) => Err(error.clone()),
                None => Ok(value),
            }
        }
    }

    impl InstanceAdmin for StubAdmin {
        fn fetch_instances(&self) -> Result<Vec<Instance>, SourceError> {
            self.result(self.instances.clone())
        }

        fn create_instance(&self, request: &CreateInstanceRequest) -> Result<Instance, SourceError> {
            *self.created.lock().expect("created lock") = Some(request.clone());
            self.result(Instance::named(request.name.clone()))
        }

        fn delete_instance(&self, _instance: &str) -> Result<(), SourceError> {
            self.result(())
        }

        fn connect_instance(&self, _instance: &str) -> Result<PairingChallenge, SourceError> {
            self.result(self.challenge.clone())
        }

        fn connection_state(&self, _instance: &str) -> Result<ConnectionStatus, SourceError> {
            self.result(ConnectionStatus::Open)
        }

        fn restart_instance(&self, _instance: &str) -> Result<(), SourceError> {
            self.result(())
        }

        fn logout_instance(&self, _instance: &str) -> Result<(), SourceError> {
            self.result(())
        }
    }

    fn request(name: &str, integration: IntegrationType) -> CreateInstanceRequest {
        CreateInstanceRequest {
            name: name.to_owned(),
            integration,
            token: None,
            number: None,
        }
    }

    #[test]
    fn instances_are_listed_by_name() {
        let admin = StubAdmin {
            instances: vec![
                Instance::named("support"),
                Instance::named("Billing"),
                Instance::named("sales"),
            ],
            ..StubAdmin::default()
        };

        let names: Vec<String> = list_instances(&admin)
            .expect("list")
            .into_iter()
            .map(|instance| instance.name)
            .collect();

        assert_eq!(names, vec!["Billing", "sales", "support"]);
    }

    #[test]
    fn create_trims_name_before_sending() {
        let admin = StubAdmin::default();

        create_instance(&admin, request("  sales  ", IntegrationType::Baileys)).expect("create");

        assert_eq!(
            admin
                .created
                .lock()
                .expect("created lock")
                .as_ref()
                .map(|request| request.name.as_str()),
            Some("sales")
        );
    }

    #[test]
    fn create_rejects_blank_names_and_incomplete_business_requests() {
        let admin = StubAdmin::default();

        assert!(matches!(
            create_instance(&admin, request(" ", IntegrationType::Baileys)),
            Err(InstanceError::InvalidRequest(_))
        ));
        assert!(matches!(
            create_instance(&admin, request("cloud", IntegrationType::Business)),
            Err(InstanceError::InvalidRequest(_))
        ));
        assert!(admin.created.lock().expect("created lock").is_none());
    }

    #[test]
    fn connect_writes_decoded_qr_image() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("qr-sales.png");
        let admin = StubAdmin {
            challenge: PairingChallenge {
                pairing_code: Some("WZYEH1YY".to_owned()),
                code: Some("2@abc".to_owned()),
                qr_base64: Some(format!("data:image/png;base64,{}", STANDARD.encode(b"PNG"))),
            },
            ..StubAdmin::default()
        };

        let outcome = connect_instance(&admin, "sales", &path).expect("connect");

        assert_eq!(
            outcome,
            ConnectOutcome::AwaitingScan {
                qr_file: Some(path.clone()),
                pairing_code: Some("WZYEH1YY".to_owned()),
            }
        );
        assert_eq!(fs::read(&path).expect("qr file"), b"PNG");
    }

    #[test]
    fn connect_without_challenge_means_already_connected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let admin = StubAdmin::default();

        let outcome =
            connect_instance(&admin, "sales", &dir.path().join("qr.png")).expect("connect");

        assert_eq!(outcome, ConnectOutcome::AlreadyConnected);
    }

    #[test]
    fn corrupted_qr_payload_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let admin = StubAdmin {
            challenge: PairingChallenge {
                qr_base64: Some("data:image/png;base64,***".to_owned()),
                ..PairingChallenge::default()
            },
            ..StubAdmin::default()
        };

        let result = connect_instance(&admin, "sales", &dir.path().join("qr.png"));

        assert_eq!(result, Err(InstanceError::QrCodeInvalid));
    }

    #[test]
    fn source_errors_are_mapped() {
        let admin = StubAdmin {
            failure: Some(SourceError::NotFound),
            ..StubAdmin::default()
        };

        assert_eq!(delete_instance(&admin, "gone"), Err(InstanceError::NotFound));
        assert_eq!(
            connection_state(&admin, "gone"),
            Err(InstanceError::NotFound)
        );
    }
}
