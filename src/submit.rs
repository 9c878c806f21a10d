use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::domain::{Action, validate_hold_date};
use crate::error::EnaError;
use crate::xml::XmlNode;

pub const DEV_SERVER_URL: &str = "https://wwwdev.ebi.ac.uk/ena/submit/drop-box/submit";
pub const PRODUCTION_SERVER_URL: &str = "https://www.ebi.ac.uk/ena/submit/drop-box/submit";

pub const USERNAME_VAR: &str = "ENA_USERNAME";
pub const PASSWORD_VAR: &str = "ENA_PASSWORD";

/// Webin credentials, passed through to the archive as basic auth. Their
/// absence is a configuration error raised before any network attempt.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, EnaError> {
        Self::from_values(
            std::env::var(USERNAME_VAR).ok(),
            std::env::var(PASSWORD_VAR).ok(),
        )
    }

    pub fn from_values(username: Option<String>, password: Option<String>) -> Result<Self, EnaError> {
        let username = username
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| EnaError::MissingCredentials(USERNAME_VAR.to_string()))?;
        let password = password
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| EnaError::MissingCredentials(PASSWORD_VAR.to_string()))?;
        Ok(Self { username, password })
    }
}

/// The `SUBMISSION` envelope declaring the requested action, plus a
/// `HOLD` sibling action when a hold date is given.
pub fn submission_xml(action: Action, hold_date: &str) -> Result<String, EnaError> {
    validate_hold_date(hold_date)?;
    let mut actions = XmlNode::new("ACTIONS").child(XmlNode::new("ACTION").child(XmlNode::new(action.tag())));
    if !hold_date.is_empty() {
        actions.add_child(
            XmlNode::new("ACTION").child(XmlNode::new("HOLD").attr("HoldUntilDate", hold_date)),
        );
    }
    XmlNode::new("SUBMISSION").child(actions).to_xml_string()
}

/// The cancellation envelope: a single `CANCEL` action targeting one
/// accession. Cancellation propagates server-side from studies to their
/// experiments and from experiments to their runs.
pub fn cancellation_xml(target_accession: &str) -> Result<String, EnaError> {
    XmlNode::new("SUBMISSION")
        .child(
            XmlNode::new("ACTIONS")
                .child(XmlNode::new("ACTION").child(XmlNode::new("CANCEL").attr("target", target_accession))),
        )
        .to_xml_string()
}

/// One part of the multipart submission request, named by its fixed
/// protocol key (`SUBMISSION`, `PROJECT`, `SAMPLE`, `EXPERIMENT`, `RUN`).
#[derive(Debug, Clone)]
pub struct SubmissionPart {
    pub key: &'static str,
    pub filename: &'static str,
    pub content: String,
}

impl SubmissionPart {
    pub fn new(key: &'static str, filename: &'static str, content: String) -> Self {
        Self {
            key,
            filename,
            content,
        }
    }
}

/// Transport seam for the drop-box endpoint, mocked in tests.
pub trait SubmissionClient: Send + Sync {
    /// Posts one multipart bundle and returns the raw response body. A
    /// `success="false"` receipt is not an error at this level; only
    /// transport failures raise.
    fn submit(&self, parts: Vec<SubmissionPart>) -> Result<Vec<u8>, EnaError>;
}

pub struct EnaHttpClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl EnaHttpClient {
    /// Builds a client against the development or production drop-box,
    /// failing early when the credential variables are unset.
    pub fn new(dev: bool) -> Result<Self, EnaError> {
        let base_url = if dev { DEV_SERVER_URL } else { PRODUCTION_SERVER_URL };
        Self::with_base_url(base_url.to_string(), Credentials::from_env()?)
    }

    pub fn with_base_url(base_url: String, credentials: Credentials) -> Result<Self, EnaError> {
        let client = Client::builder()
            .user_agent(format!("ena-submit/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| EnaError::SubmitHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }
}

impl SubmissionClient for EnaHttpClient {
    fn submit(&self, parts: Vec<SubmissionPart>) -> Result<Vec<u8>, EnaError> {
        let mut form = Form::new();
        for part in parts {
            debug!("attaching submission part {}", part.key);
            let form_part = Part::text(part.content)
                .file_name(part.filename)
                .mime_str("text/xml")
                .map_err(|err| EnaError::SubmitHttp(err.to_string()))?;
            form = form.part(part.key, form_part);
        }

        let response = self
            .client
            .post(&self.base_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .multipart(form)
            .send()
            .map_err(|err| EnaError::SubmitHttp(err.to_string()))?;

        // A non-2xx body is still a receipt worth keeping; surface the
        // status as a warning and let the caller inspect the bytes.
        let status = response.status();
        if !status.is_success() {
            warn!("ENA server returned status {status}");
        }
        let bytes = response
            .bytes()
            .map_err(|err| EnaError::SubmitHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn envelope_without_hold_date() {
        let xml = submission_xml(Action::Add, "").unwrap();
        assert_eq!(
            xml,
            "<SUBMISSION><ACTIONS><ACTION><ADD/></ACTION></ACTIONS></SUBMISSION>"
        );
    }

    #[test]
    fn envelope_with_hold_date() {
        let hold = chrono::Utc::now()
            .date_naive()
            .checked_add_months(chrono::Months::new(2))
            .unwrap()
            .format("%Y-%m-%d")
            .to_string();
        let xml = submission_xml(Action::Modify, &hold).unwrap();
        assert_eq!(
            xml,
            format!(
                "<SUBMISSION><ACTIONS><ACTION><MODIFY/></ACTION>\
                 <ACTION><HOLD HoldUntilDate=\"{hold}\"/></ACTION></ACTIONS></SUBMISSION>"
            )
        );
    }

    #[test]
    fn cancellation_envelope_targets_accession() {
        let xml = cancellation_xml("ERS123").unwrap();
        assert_eq!(
            xml,
            "<SUBMISSION><ACTIONS><ACTION><CANCEL target=\"ERS123\"/></ACTION></ACTIONS></SUBMISSION>"
        );
    }

    #[test]
    fn credentials_require_both_values() {
        let err = Credentials::from_values(Some("webin-1".to_string()), None).unwrap_err();
        assert_matches!(err, EnaError::MissingCredentials(ref var) if var == PASSWORD_VAR);

        let err = Credentials::from_values(None, Some("secret".to_string())).unwrap_err();
        assert_matches!(err, EnaError::MissingCredentials(ref var) if var == USERNAME_VAR);

        let err = Credentials::from_values(Some("  ".to_string()), Some("secret".to_string()))
            .unwrap_err();
        assert_matches!(err, EnaError::MissingCredentials(_));
    }
}
