use actix_web::{HttpResponse, Responder};
use serde::Serialize;

use super::{error::Res, events::OutboundCommand};

/// Body returned to the gateway for every accepted event.
#[derive(Debug, Serialize)]
pub struct CommandBatch {
    pub commands: Vec<OutboundCommand>,
}

pub struct Success;
impl Success {
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Ok().json(body))
    }
    pub fn commands(commands: Vec<OutboundCommand>) -> Res<impl Responder> {
        Self::ok(CommandBatch { commands })
    }
}
