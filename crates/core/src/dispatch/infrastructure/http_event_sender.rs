use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};

use super::jpeg_encoder::encode_jpeg;
use crate::dispatch::domain::dispatch_error::DispatchError;
use crate::dispatch::domain::event_sender::EventSender;
use crate::dispatch::domain::sighting_event::SightingEvent;
use crate::shared::constants::EVENT_TYPE_ENTER;

/// Posts sightings to the collector as `multipart/form-data`.
///
/// Fields: `node_id`, `event_time` (Unix seconds at first sighting),
/// `event_type` and the JPEG `event_image`.
pub struct HttpEventSender {
    client: reqwest::blocking::Client,
    url: reqwest::Url,
}

impl HttpEventSender {
    pub fn new(url: reqwest::Url, timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::blocking::Client, url: reqwest::Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

impl EventSender for HttpEventSender {
    fn send(&self, event: &SightingEvent) -> Result<u16, DispatchError> {
        let jpeg = encode_jpeg(&event.image)?;
        let image = Part::bytes(jpeg)
            .file_name("face.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .text("node_id", event.node_id.to_string())
            .text("event_time", event.event_time_secs().to_string())
            .text("event_type", EVENT_TYPE_ENTER.to_string())
            .part("event_image", image);

        let status = self
            .client
            .post(self.url.clone())
            .multipart(form)
            .send()?
            .status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(DispatchError::Http {
                status: status.as_u16(),
            })
        }
    }
}
