//! Scripted fakes shared by the unit tests.

use crate::{
    client::ApiClient,
    config::Config,
    session::{AccountStatus, Role, Session, SessionManager, Token, User},
    storage::{Storage, StorageError},
    transport::{HttpRequest, HttpResponse, Transport, TransportError},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::VecDeque,
    io::{self, ErrorKind},
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::time::Instant;

/// One canned reaction to a request.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Respond { status: u16, body: Vec<u8> },
    Fail(TransportError),
    /// Never answer, so the client's timeout has to kick in.
    Hang,
}

impl Scripted {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Scripted::Respond {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    pub(crate) fn raw(status: u16, body: &str) -> Self {
        Scripted::Respond {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    pub(crate) fn refused() -> Self {
        Scripted::Fail(TransportError::Connect(String::from(
            "connection refused",
        )))
    }
}

/// Plays back [`Scripted`] reactions in order and records every request.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl FakeTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Self {
        FakeTransport {
            script: Mutex::new(script.into()),
            sent: Mutex::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, req)| req.clone())
            .collect()
    }

    pub(crate) fn times(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push((Instant::now(), request));
        let next = self.script.lock().unwrap().pop_front();

        match next {
            Some(Scripted::Respond { status, body }) => {
                Ok(HttpResponse { status, body })
            },
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(TransportError::Connect(String::from(
                "the script ran out",
            ))),
        }
    }
}

pub(crate) fn client_with(
    script: Vec<Scripted>,
) -> (ApiClient, Arc<FakeTransport>) {
    client_with_session(script, SessionManager::in_memory())
}

pub(crate) fn client_with_session(
    script: Vec<Scripted>,
    session: SessionManager,
) -> (ApiClient, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::new(script));
    let client = ApiClient::with_transport(
        Config::for_origin(None).unwrap(),
        Arc::clone(&transport) as Arc<dyn Transport>,
        session.into_shared(),
    );

    (client, transport)
}

pub(crate) fn alice() -> Session {
    Session::new(
        Token::new("alice"),
        User {
            username: String::from("alice"),
            role: Role::Admin,
            status: Some(AccountStatus::Active),
        },
    )
}

/// Accepts writes but can never delete anything, like a read-only disk.
#[derive(Debug, Default)]
pub(crate) struct FailingStorage;

impl Storage for FailingStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_many(&self, _entries: &[(&str, &str)]) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove_many(&self, _keys: &[&str]) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: PathBuf::from("session.json"),
            error: io::Error::new(ErrorKind::PermissionDenied, "read-only"),
        })
    }
}
