//! Host window abstractions: the opener window, the popup it opens, and
//! in-app navigation.

use super::message::MessageChannel;

/// Position and outer size of the current window, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub screen_x: i32,
    pub screen_y: i32,
    pub outer_width: i32,
    pub outer_height: i32,
}

/// Size and placement requested for a popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: i32,
    pub height: i32,
    pub left: i32,
    pub top: i32,
}

impl PopupFeatures {
    /// Center a `width` x `height` popup over the given window.
    pub fn centered(geometry: WindowGeometry, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            left: geometry.screen_x + (geometry.outer_width - width) / 2,
            top: geometry.screen_y + (geometry.outer_height - height) / 2,
        }
    }

    /// Render as a `window.open` features string.
    pub fn to_feature_string(&self) -> String {
        format!(
            "width={},height={},left={},top={}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Handle to an opened popup window.
pub trait PopupHandle: Send + Sync {
    fn is_closed(&self) -> bool;
    fn close(&self);
}

/// The window that starts a login.
pub trait WindowHost: Send + Sync {
    /// Origin of the page, e.g. `https://app.example.com`.
    fn origin(&self) -> &str;

    fn geometry(&self) -> WindowGeometry;

    /// Open a popup. `None` means the host refused (popup blocked).
    fn open(&self, url: &str, features: &PopupFeatures) -> Option<Box<dyn PopupHandle>>;

    /// Message events delivered to this window.
    fn messages(&self) -> &MessageChannel;
}

/// Application routes the callback page navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login { error: Option<String> },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login { error: None } => "/login".to_string(),
            Route::Login { error: Some(error) } => {
                format!("/login?error={}", urlencoding::encode(error))
            }
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
}
