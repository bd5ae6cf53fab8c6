//! View state and its rendering.
//!
//! [`ViewState`] is the single source of truth for what the page shows. It
//! changes only through the transition methods below; [`render`] turns it
//! into a [`View`] without side effects.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use shared::domain::{HealthStatus, Record, RecordId};

use crate::audio::AudioHandle;

pub const SUBMIT_LABEL: &str = "Convert to Speech";
pub const SUBMITTING_LABEL: &str = "Converting...";

pub fn is_submittable(text: &str) -> bool {
    !text.trim().is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionState {
    pub records: Vec<Record>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for CollectionState {
    // Loading until the single fetch resolves.
    fn default() -> Self {
        Self {
            records: Vec::new(),
            is_loading: true,
            error: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConversionState {
    pub input_text: String,
    pub is_submitting: bool,
    audio: Option<AudioHandle>,
}

impl ConversionState {
    pub fn audio(&self) -> Option<&AudioHandle> {
        self.audio.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyInput,
    Busy,
    Unmounted,
}

#[derive(Debug, Default)]
pub struct ViewState {
    health: HealthStatus,
    collection: CollectionState,
    conversion: ConversionState,
    unmounted: bool,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health(&self) -> HealthStatus {
        self.health
    }

    pub fn collection(&self) -> &CollectionState {
        &self.collection
    }

    pub fn conversion(&self) -> &ConversionState {
        &self.conversion
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// First resolution wins; returns `false` if health was already set.
    pub fn resolve_health(&mut self, status: HealthStatus) -> bool {
        if self.health.is_resolved() || !status.is_resolved() {
            return false;
        }
        self.health = status;
        true
    }

    pub fn begin_collection_load(&mut self) {
        self.collection.is_loading = true;
    }

    pub fn finish_collection_load(&mut self, result: Result<Vec<Record>, String>) {
        self.collection.is_loading = false;
        match result {
            Ok(records) => {
                self.collection.records = records;
                self.collection.error = None;
            }
            Err(message) => {
                self.collection.records.clear();
                self.collection.error = Some(message);
            }
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.conversion.input_text = text.into();
    }

    /// Claims the single submission slot and returns the text to send.
    pub fn try_begin_submit(&mut self) -> Result<String, SubmitRejection> {
        if self.unmounted {
            return Err(SubmitRejection::Unmounted);
        }
        if self.conversion.is_submitting {
            return Err(SubmitRejection::Busy);
        }
        if !is_submittable(&self.conversion.input_text) {
            return Err(SubmitRejection::EmptyInput);
        }
        self.conversion.is_submitting = true;
        Ok(self.conversion.input_text.clone())
    }

    pub fn finish_submit(&mut self) {
        self.conversion.is_submitting = false;
    }

    /// Releases the current handle before `create` allocates its successor,
    /// so two handles are never live at once. After teardown nothing is
    /// allocated and `None` is returned.
    pub fn replace_audio<F>(&mut self, create: F) -> Option<&AudioHandle>
    where
        F: FnOnce() -> AudioHandle,
    {
        if self.unmounted {
            return None;
        }
        self.release_audio();
        Some(self.conversion.audio.insert(create()))
    }

    pub fn release_audio(&mut self) -> bool {
        match self.conversion.audio.take() {
            Some(handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }

    /// Releases the audio handle and refuses any later submission or audio.
    /// An outstanding submission keeps `is_submitting` until it completes.
    pub fn teardown(&mut self) {
        self.unmounted = true;
        self.release_audio();
    }
}

const DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Formats record timestamps the way `toLocaleDateString` does for en-US.
///
/// `Local` applies the zone rules in effect on each record's own date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    Local,
    Fixed(FixedOffset),
}

impl DateStyle {
    pub fn local() -> Self {
        DateStyle::Local
    }

    pub fn utc() -> Self {
        DateStyle::Fixed(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        DateStyle::Fixed(offset)
    }

    pub fn format(&self, value: &DateTime<Utc>) -> String {
        let formatted = match self {
            DateStyle::Local => value.with_timezone(&Local).format(DATE_FORMAT),
            DateStyle::Fixed(offset) => value.with_timezone(offset).format(DATE_FORMAT),
        };
        formatted.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Yellow,
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthIndicator {
    pub status: HealthStatus,
    pub color: IndicatorColor,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCard {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionView {
    Loading,
    Error(String),
    Grid(Vec<RecordCard>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioElement {
    pub src: String,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPanel {
    pub input: String,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    pub audio: Option<AudioElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub health: HealthIndicator,
    pub collection: CollectionView,
    pub conversion: ConversionPanel,
}

pub fn render(state: &ViewState, dates: &DateStyle) -> View {
    View {
        health: render_health(state.health),
        collection: render_collection(&state.collection, dates),
        conversion: render_conversion(&state.conversion),
    }
}

fn render_health(status: HealthStatus) -> HealthIndicator {
    let (color, label) = match status {
        HealthStatus::Unknown => (IndicatorColor::Yellow, "Checking backend..."),
        HealthStatus::Healthy => (IndicatorColor::Green, "Backend healthy"),
        HealthStatus::Unhealthy => (IndicatorColor::Red, "Backend unavailable"),
    };
    HealthIndicator {
        status,
        color,
        label,
    }
}

fn render_collection(collection: &CollectionState, dates: &DateStyle) -> CollectionView {
    if collection.is_loading {
        return CollectionView::Loading;
    }
    if let Some(message) = &collection.error {
        return CollectionView::Error(message.clone());
    }
    CollectionView::Grid(
        collection
            .records
            .iter()
            .map(|record| RecordCard {
                id: record.id,
                name: record.name.clone(),
                email: record.email.clone(),
                created: dates.format(&record.created_at),
            })
            .collect(),
    )
}

fn render_conversion(conversion: &ConversionState) -> ConversionPanel {
    ConversionPanel {
        input: conversion.input_text.clone(),
        submit_enabled: !conversion.is_submitting && is_submittable(&conversion.input_text),
        submit_label: if conversion.is_submitting {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        },
        audio: conversion.audio.as_ref().map(|handle| AudioElement {
            src: handle.url().to_string(),
            mime: handle.mime().to_string(),
        }),
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dot = match self.health.color {
            IndicatorColor::Yellow => "yellow",
            IndicatorColor::Green => "green",
            IndicatorColor::Red => "red",
        };
        writeln!(f, "[{dot}] {}", self.health.label)?;

        match &self.collection {
            CollectionView::Loading => writeln!(f, "Loading users...")?,
            CollectionView::Error(message) => writeln!(f, "Error: {message}")?,
            CollectionView::Grid(cards) if cards.is_empty() => writeln!(f, "No users found.")?,
            CollectionView::Grid(cards) => {
                for card in cards {
                    writeln!(f, "- {} <{}> created {}", card.name, card.email, card.created)?;
                }
            }
        }

        let state = if self.conversion.submit_enabled {
            "enabled"
        } else {
            "disabled"
        };
        writeln!(f, "Text: {:?}", self.conversion.input)?;
        write!(f, "[{}] ({state})", self.conversion.submit_label)?;
        if let Some(audio) = &self.conversion.audio {
            write!(f, "\nGenerated Audio: {} ({})", audio.src, audio.mime)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
