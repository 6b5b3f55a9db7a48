use std::ops::RangeInclusive;

use crate::error::ValidationError;

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;
pub const DEFAULT_MODEL: &str = "local-model";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a helpful AI assistant. Be concise, friendly, and informative.";

/// Settings applied to the next turn of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub model: String,
    pub temperature: f32,
    pub system_message: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
        }
    }
}

/// A partial configuration change. Fields left as `None` are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationUpdate {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub system_message: Option<String>,
}

impl ConfigurationUpdate {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.temperature.is_none() && self.system_message.is_none()
    }
}

pub fn validate_temperature(temperature: f32) -> Result<f32, ValidationError> {
    // NaN fails `contains`
    if TEMPERATURE_RANGE.contains(&temperature) {
        Ok(temperature)
    } else {
        Err(ValidationError::TemperatureOutOfRange(temperature))
    }
}

impl Configuration {
    /// Returns the configuration that results from applying `update`, or the
    /// first validation failure. `self` is never modified.
    pub fn merged(
        &self,
        update: &ConfigurationUpdate,
        catalog: &ModelCatalog,
    ) -> Result<Self, ValidationError> {
        let mut next = self.clone();

        if let Some(temperature) = update.temperature {
            next.temperature = validate_temperature(temperature)?;
        }
        if let Some(model) = &update.model {
            next.model = catalog.check(model)?.to_string();
        }
        if let Some(system_message) = &update.system_message {
            next.system_message = system_message.clone();
        }

        Ok(next)
    }
}

/// The set of model identifiers a session may select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![DEFAULT_MODEL.to_string()],
        }
    }
}

impl ModelCatalog {
    pub fn new<I, S>(models: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self { models: Vec::new() };
        for model in models {
            catalog.insert(model);
        }

        if catalog.models.is_empty() {
            return Err(ValidationError::EmptyModelCatalog);
        }
        Ok(catalog)
    }

    /// Adds `model` if it is non-blank and not already present.
    pub fn insert(&mut self, model: impl Into<String>) {
        let model = model.into();
        let model = model.trim();
        if !model.is_empty() && !self.contains(model) {
            self.models.push(model.to_string());
        }
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn check<'a>(&self, model: &'a str) -> Result<&'a str, ValidationError> {
        if self.contains(model) {
            Ok(model)
        } else {
            Err(ValidationError::UnsupportedModel {
                model: model.to_string(),
                supported: self.models.clone(),
            })
        }
    }
}
