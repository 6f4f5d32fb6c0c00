use crate::error::{AppError, ErrorReason};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: Option<u16>,
}

impl Target {
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }

    /// `host:port` suitable for `TcpStream::connect`.
    pub fn socket_address(&self, default_port: u16) -> String {
        let port = self.port_or(default_port);
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, port)
        } else {
            format!("{}:{}", self.host, port)
        }
    }
}

impl FromStr for Target {
    type Err = AppError;

    fn from_str(target: &str) -> Result<Self, Self::Err> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ErrorReason::InvalidTarget.into());
        }

        // [v6]:port or [v6]
        if let Some(rest) = target.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or(ErrorReason::InvalidTarget)?;
            let port = match tail {
                "" => None,
                tail => Some(parse_port(
                    tail.strip_prefix(':').ok_or(ErrorReason::InvalidTarget)?,
                )?),
            };
            return Ok(Target {
                host: host.to_owned(),
                port,
            });
        }

        match target.rsplit_once(':') {
            // A bare IPv6 literal has several colons and no port
            Some((host, _)) if host.contains(':') => Ok(Target {
                host: target.to_owned(),
                port: None,
            }),
            Some((host, port)) if !host.is_empty() => Ok(Target {
                host: host.to_owned(),
                port: Some(parse_port(port)?),
            }),
            Some(_) => Err(ErrorReason::InvalidTarget.into()),
            None => Ok(Target {
                host: target.to_owned(),
                port: None,
            }),
        }
    }
}

fn parse_port(port: &str) -> Result<u16, AppError> {
    port.parse().map_err(|_| ErrorReason::InvalidTarget.into())
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.port {
            Some(port) if self.host.contains(':') => write!(f, "[{}]:{}", self.host, port),
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}
