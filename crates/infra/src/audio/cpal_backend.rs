//! CPAL-based endpoint catalog
//!
//! Reads the host's real input and output devices through CPAL so the
//! simulated provider can present the machine's actual endpoints. CPAL
//! abstracts the platform APIs:
//! - Windows: WASAPI
//! - Linux: ALSA/PulseAudio
//! - macOS: CoreAudio

use cpal::traits::{DeviceTrait, HostTrait};
use sonus_core::domain::audio::{AudioError, DeviceDirection, DeviceId, EndpointInfo, Result};
use tracing::{debug, info, warn};

/// Enumerates host endpoints through CPAL
pub struct CpalDeviceCatalog {
    host: cpal::Host,
}

impl Default for CpalDeviceCatalog {
    fn default() -> Self {
        info!("Initializing CPAL device catalog");
        Self::new()
    }
}

impl CpalDeviceCatalog {
    pub fn new() -> Self {
        let host = cpal::default_host();
        debug!("Using audio host: {:?}", host.id());
        Self { host }
    }

    /// Stable endpoint id derived from direction and device name
    pub fn endpoint_id(direction: DeviceDirection, name: &str) -> DeviceId {
        DeviceId::new(format!("{}:{}", direction, name))
    }

    fn endpoint(direction: DeviceDirection, device: &cpal::Device) -> EndpointInfo {
        #[allow(deprecated)]
        let name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        EndpointInfo {
            id: Self::endpoint_id(direction, &name),
            friendly_name: name,
        }
    }

    /// Endpoints for one direction, deduplicated by id
    pub fn endpoints(&self, direction: DeviceDirection) -> Result<Vec<EndpointInfo>> {
        let devices: Vec<cpal::Device> = match direction {
            DeviceDirection::Output => self.host.output_devices().map(|d| d.collect::<Vec<_>>()),
            DeviceDirection::Input => self.host.input_devices().map(|d| d.collect::<Vec<_>>()),
        }
        .map_err(|e| AudioError::OsError(e.to_string()))?;

        let mut endpoints: Vec<EndpointInfo> = Vec::new();
        for device in devices {
            let endpoint = Self::endpoint(direction, &device);
            if endpoints.iter().any(|e| e.id == endpoint.id) {
                warn!(device = %endpoint.id, "Skipping duplicate device name");
                continue;
            }
            debug!(device = %endpoint.id, "Found device");
            endpoints.push(endpoint);
        }

        info!(%direction, count = endpoints.len(), "Enumerated host devices");
        Ok(endpoints)
    }

    /// The host's default endpoint for one direction
    pub fn default_endpoint(&self, direction: DeviceDirection) -> Option<EndpointInfo> {
        let device = match direction {
            DeviceDirection::Output => self.host.default_output_device(),
            DeviceDirection::Input => self.host.default_input_device(),
        }?;

        Some(Self::endpoint(direction, &device))
    }
}
