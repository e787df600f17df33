use std::ffi::{CStr, CString};

use ash::{extensions::ext, vk};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Everything [`Instance::new`](crate::instance::Instance::new) needs to
/// know up front.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: u32,
    /// Enables the Khronos validation layer and debug utils.
    pub validation: bool,
    pub extensions: Vec<CString>,
    pub layers: Vec<CString>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            application_name: "vulkan-planner".into(),
            application_version: vk::make_api_version(0, 0, 1, 0),
            engine_name: "vulkan-planner".into(),
            engine_version: vk::make_api_version(0, 0, 1, 0),
            api_version: vk::API_VERSION_1_3,
            validation: cfg!(debug_assertions),
            extensions: Vec::new(),
            layers: Vec::new(),
        }
    }
}

impl InstanceConfig {
    pub fn with_application(mut self, name: impl Into<String>, version: u32) -> Self {
        self.application_name = name.into();
        self.application_version = version;
        self
    }

    pub fn with_api_version(mut self, api_version: u32) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_extensions<'a>(mut self, extensions: impl IntoIterator<Item = &'a CStr>) -> Self {
        for extension in extensions {
            if !self.extensions.iter().any(|e| e.as_c_str() == extension) {
                self.extensions.push(extension.to_owned());
            }
        }
        self
    }

    pub fn with_layer(mut self, layer: &CStr) -> Self {
        if !self.layers.iter().any(|l| l.as_c_str() == layer) {
            self.layers.push(layer.to_owned());
        }
        self
    }

    /// Extensions to enable, including the ones validation pulls in.
    pub fn enabled_extensions(&self) -> Vec<CString> {
        let mut extensions = self.extensions.clone();
        let debug_utils = ext::DebugUtils::name();
        if self.validation && !extensions.iter().any(|e| e.as_c_str() == debug_utils) {
            extensions.push(debug_utils.to_owned());
        }
        extensions
    }

    /// Layers to enable, including the validation layer when requested.
    pub fn enabled_layers(&self) -> Vec<CString> {
        let mut layers = self.layers.clone();
        if self.validation && !layers.iter().any(|l| l.as_c_str() == VALIDATION_LAYER) {
            layers.push(VALIDATION_LAYER.to_owned());
        }
        layers
    }
}
