extern crate clap;

use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[clap(name = "transport-office")]
#[clap(version = "0.1.0")]
#[clap(about = "college transport office backend with applications, fleet and analytics", long_about = None)]
pub struct Args {
    #[clap(short, long, default_value_t = String::from("127.0.0.1"))]
    pub host: String,

    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// keep everything in memory instead of talking to postgres
    #[clap(short, long, action)]
    pub offline: bool,

    #[clap(short, long, action)]
    pub verbose: bool,
}

/// Response body every endpoint answers with.
#[derive(Serialize, Debug)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Envelope<T> {
        Envelope {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: &str) -> Envelope<T> {
        self.message = Some(message.to_string());
        self
    }

    pub fn failure(message: String) -> Envelope<T> {
        Envelope {
            success: false,
            message: Some(message),
            count: None,
            data: None,
        }
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    pub fn list(data: Vec<T>) -> Envelope<Vec<T>> {
        Envelope {
            success: true,
            message: None,
            count: Some(data.len()),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: &str) -> Envelope<()> {
        Envelope {
            success: true,
            message: Some(message.to_string()),
            count: None,
            data: None,
        }
    }
}
