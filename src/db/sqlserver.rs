// ABOUTME: SQL Server command runner using tiberius
// ABOUTME: Opens a dedicated TDS connection per run and classifies server errors by kind

use log::debug;
use std::time::Duration;
use tiberius::error::Error as TdsError;
use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::connection_string;
use super::runner::{CommandRunner, Session, SessionAction};
use crate::error::ProvisionError;
use crate::models::ConnectionTarget;

type TdsClient = Client<Compat<TcpStream>>;

/// Server error numbers that mean the login lacks a permission.
const PERMISSION_ERRORS: &[u32] = &[
    229,   // permission denied on object
    230,   // permission denied on column
    262,   // CREATE DATABASE permission denied
    297,   // user does not have permission to perform this action
    300,   // permission was denied on object
    916,   // principal cannot access database under current security context
    15247, // user does not have permission to perform this action
];

pub fn is_permission_error(code: u32) -> bool {
    PERMISSION_ERRORS.contains(&code)
}

/// Runner backed by tiberius.
///
/// tiberius has no connection pool, so every [`CommandRunner::run`] call
/// logs in on a brand new TCP connection and picks up the login's current
/// server permissions. The blocking API drives a private current-thread
/// runtime.
pub struct TdsCommandRunner {
    runtime: Runtime,
    connect_timeout: Duration,
}

impl TdsCommandRunner {
    pub fn new(connect_timeout: Duration) -> Result<Self, ProvisionError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProvisionError::ConnectionFailed {
                target: "tokio runtime".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            runtime,
            connect_timeout,
        })
    }

    async fn connect(&self, target: &ConnectionTarget) -> Result<TdsClient, ProvisionError> {
        let conn_str = connection_string::for_target(target);
        debug!("Connecting: {}", connection_string::mask(&conn_str));

        let failed = |message: String| ProvisionError::ConnectionFailed {
            target: target.to_string(),
            message,
        };

        let config = Config::from_ado_string(&conn_str).map_err(|e| failed(e.to_string()))?;

        // Resolves named instances through SQL Browser; plain hosts connect directly.
        let tcp = timeout(self.connect_timeout, TcpStream::connect_named(&config))
            .await
            .map_err(|_| failed(format!("timed out after {:?}", self.connect_timeout)))?
            .map_err(|e| failed(e.to_string()))?;

        tcp.set_nodelay(true).map_err(|e| failed(e.to_string()))?;

        let client = timeout(self.connect_timeout, Client::connect(config, tcp.compat_write()))
            .await
            .map_err(|_| failed(format!("login timed out after {:?}", self.connect_timeout)))?
            .map_err(|e| failed(e.to_string()))?;

        Ok(client)
    }
}

impl CommandRunner for TdsCommandRunner {
    fn run(
        &self,
        target: &ConnectionTarget,
        action: &mut SessionAction<'_>,
    ) -> Result<(), ProvisionError> {
        let mut client = self.runtime.block_on(self.connect(target))?;

        let result = {
            let mut session = SqlServerSession {
                runtime: &self.runtime,
                client: &mut client,
                target,
            };
            action(&mut session)
        };

        if let Err(e) = self.runtime.block_on(client.close()) {
            debug!("Closing connection to {} failed: {}", target, e);
        }

        result
    }
}

struct SqlServerSession<'a> {
    runtime: &'a Runtime,
    client: &'a mut TdsClient,
    target: &'a ConnectionTarget,
}

impl SqlServerSession<'_> {
    fn classify(&self, err: TdsError) -> ProvisionError {
        match &err {
            TdsError::Server(token) if is_permission_error(token.code()) => {
                ProvisionError::PermissionDenied(err.to_string())
            }
            TdsError::Io { .. } => ProvisionError::ConnectionFailed {
                target: self.target.to_string(),
                message: err.to_string(),
            },
            _ => ProvisionError::StatementFailed(err.to_string()),
        }
    }
}

impl Session for SqlServerSession<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), ProvisionError> {
        debug!("Executing on {}: {}", self.target, first_line(sql));
        let client = &mut *self.client;
        let result = self.runtime.block_on(async move {
            let stream = client.simple_query(sql).await?;
            stream.into_results().await?;
            Ok::<(), TdsError>(())
        });
        result.map_err(|e| self.classify(e))
    }

    fn execute_scalar(&mut self, sql: &str) -> Result<Option<i32>, ProvisionError> {
        debug!("Querying on {}: {}", self.target, first_line(sql));
        let client = &mut *self.client;
        let result = self.runtime.block_on(async move {
            let row = client.simple_query(sql).await?.into_row().await?;
            match row {
                Some(row) => row.try_get::<i32, _>(0),
                None => Ok(None),
            }
        });
        result.map_err(|e| self.classify(e))
    }
}

fn first_line(sql: &str) -> &str {
    sql.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}
