//! Camera permission state and the user-facing notice shown when access is missing.

use std::fmt;

/// Whether the application may open camera streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Access granted; streams may be opened
    Granted,
    /// The user or the OS refused access
    Denied,
    /// Not decided yet; an explicit request is required before opening a stream
    Prompt,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

/// Where to grant camera access on the current platform.
pub fn settings_path() -> &'static str {
    if cfg!(target_os = "macos") {
        "System Settings > Privacy & Security > Camera"
    } else if cfg!(target_os = "windows") {
        "Settings > Privacy & security > Camera"
    } else {
        "your desktop's privacy settings, and make sure your user can read /dev/video* (usually the 'video' group)"
    }
}

/// Deep link that opens the camera privacy pane, where the platform has one.
pub fn settings_url() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("x-apple.systempreferences:com.apple.preference.security?Privacy_Camera")
    } else if cfg!(target_os = "windows") {
        Some("ms-settings:privacy-webcam")
    } else {
        None
    }
}

/// Blocking message shown instead of the capture UI when camera access is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionNotice {
    pub state: PermissionState,
    pub details: Option<String>,
}

impl PermissionNotice {
    pub fn denied(details: Option<String>) -> Self {
        Self {
            state: PermissionState::Denied,
            details,
        }
    }
}

impl fmt::Display for PermissionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Camera permission is required.\n\nPlease grant permission in:\n  {}",
            settings_path()
        )?;

        if let Some(url) = settings_url() {
            write!(f, "\n\nYou can open the settings directly with:\n  {}", url)?;
        }

        if let Some(ref details) = self.details {
            write!(f, "\n\nDetails: {}", details)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_granted_is_granted() {
        assert!(PermissionState::Granted.is_granted());
        assert!(!PermissionState::Denied.is_granted());
        assert!(!PermissionState::Prompt.is_granted());
    }

    #[test]
    fn test_notice_mentions_settings_path() {
        let notice = PermissionNotice::denied(None);
        let text = notice.to_string();
        assert!(text.starts_with("Camera permission is required."));
        assert!(text.contains(settings_path()));
        assert!(!text.contains("Details:"));
    }

    #[test]
    fn test_notice_includes_details() {
        let notice = PermissionNotice::denied(Some("user dismissed the prompt".to_string()));
        assert!(notice.to_string().ends_with("Details: user dismissed the prompt"));
    }
}
