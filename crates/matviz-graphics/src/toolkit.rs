//! The rendering-backend seam.
//!
//! The engine never draws; it notifies a [`GraphicsToolkit`] of object
//! lifecycle and property changes and asks it to redraw or print.
//! [`NullToolkit`] is the headless default; [`RecordingToolkit`] captures
//! every notification for assertions in tests.

use std::sync::{Arc, Mutex};

use crate::error::GraphicsError;
use crate::handle::Handle;

/// Rendering backend contract.
pub trait GraphicsToolkit: Send {
    fn name(&self) -> &str;

    /// Lifecycle hook on object creation.
    fn initialize(&mut self, handle: Handle) {
        let _ = handle;
    }

    /// Lifecycle hook on object destruction.
    fn finalize(&mut self, handle: Handle) {
        let _ = handle;
    }

    /// Fired after a property value actually changed.
    fn update(&mut self, handle: Handle, property: &str) {
        let _ = (handle, property);
    }

    fn redraw_figure(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        let _ = handle;
        Ok(())
    }

    /// `debug_file` receives intermediate output when nonempty.
    fn print_figure(
        &mut self,
        handle: Handle,
        terminal: &str,
        file: &str,
        monochrome: bool,
        debug_file: &str,
    ) -> Result<(), GraphicsError> {
        let _ = (handle, terminal, file, monochrome, debug_file);
        Err(GraphicsError::InvalidArgument(format!(
            "graphics toolkit \"{}\" does not support printing",
            self.name()
        )))
    }

    /// Drawable size of a figure's canvas in pixels.
    fn canvas_size(&self, handle: Handle) -> [f64; 2] {
        let _ = handle;
        [560.0, 420.0]
    }

    /// Screen resolution in dots per inch.
    fn screen_resolution(&self) -> f64 {
        72.0
    }

    /// Full screen size in pixels.
    fn screen_size(&self) -> [f64; 2] {
        [1920.0, 1080.0]
    }
}

/// Headless toolkit that accepts and ignores every notification.
#[derive(Debug, Default)]
pub struct NullToolkit;

impl GraphicsToolkit for NullToolkit {
    fn name(&self) -> &str {
        "null"
    }
}

/// Every notification a [`RecordingToolkit`] has observed.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolkitCall {
    Initialize(Handle),
    Finalize(Handle),
    Update(Handle, String),
    RedrawFigure(Handle),
    PrintFigure(Handle, String, String),
}

/// Test toolkit that records calls into a shared log.
#[derive(Debug, Default)]
pub struct RecordingToolkit {
    calls: Arc<Mutex<Vec<ToolkitCall>>>,
}

impl RecordingToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the call log, live across the toolkit's move
    /// into a context.
    pub fn calls(&self) -> Arc<Mutex<Vec<ToolkitCall>>> {
        self.calls.clone()
    }

    fn record(&self, call: ToolkitCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

impl GraphicsToolkit for RecordingToolkit {
    fn name(&self) -> &str {
        "recording"
    }

    fn initialize(&mut self, handle: Handle) {
        self.record(ToolkitCall::Initialize(handle));
    }

    fn finalize(&mut self, handle: Handle) {
        self.record(ToolkitCall::Finalize(handle));
    }

    fn update(&mut self, handle: Handle, property: &str) {
        self.record(ToolkitCall::Update(handle, property.to_string()));
    }

    fn redraw_figure(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        self.record(ToolkitCall::RedrawFigure(handle));
        Ok(())
    }

    fn print_figure(
        &mut self,
        handle: Handle,
        terminal: &str,
        file: &str,
        _monochrome: bool,
        _debug_file: &str,
    ) -> Result<(), GraphicsError> {
        self.record(ToolkitCall::PrintFigure(
            handle,
            terminal.to_string(),
            file.to_string(),
        ));
        Ok(())
    }
}

/// Names of the toolkits this build knows how to construct.
pub fn available_toolkits() -> Vec<&'static str> {
    vec!["null"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_toolkit_captures_notifications_in_order() {
        let mut tk = RecordingToolkit::new();
        let log = tk.calls();
        let h = Handle::new(1.0);
        tk.initialize(h);
        tk.update(h, "color");
        tk.redraw_figure(h).unwrap();
        tk.finalize(h);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ToolkitCall::Initialize(h),
                ToolkitCall::Update(h, "color".into()),
                ToolkitCall::RedrawFigure(h),
                ToolkitCall::Finalize(h),
            ]
        );
    }

    #[test]
    fn null_toolkit_refuses_to_print() {
        let mut tk = NullToolkit;
        assert!(tk
            .print_figure(Handle::new(1.0), "png", "out.png", false, "")
            .is_err());
    }
}
