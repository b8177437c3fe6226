use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TweakCategory {
    Aesthetics,
    Performance,
    Privacy,
    Experimental,
    Custom,
}

impl TweakCategory {
    pub const ALL: [TweakCategory; 5] = [
        TweakCategory::Aesthetics,
        TweakCategory::Performance,
        TweakCategory::Privacy,
        TweakCategory::Experimental,
        TweakCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TweakCategory::Aesthetics => "Aesthetics",
            TweakCategory::Performance => "Performance",
            TweakCategory::Privacy => "Privacy",
            TweakCategory::Experimental => "Experimental",
            TweakCategory::Custom => "Custom Tweaks",
        }
    }
}

impl fmt::Display for TweakCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unrecognized category strings decode as Experimental rather than failing,
// so a newer remote catalog never breaks an older client.
impl From<String> for TweakCategory {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Aesthetics" => TweakCategory::Aesthetics,
            "Performance" => TweakCategory::Performance,
            "Privacy" => TweakCategory::Privacy,
            "Custom Tweaks" => TweakCategory::Custom,
            _ => TweakCategory::Experimental,
        }
    }
}

impl From<TweakCategory> for String {
    fn from(c: TweakCategory) -> Self {
        c.as_str().to_string()
    }
}

/// One named unit of filesystem paths to run through the exploit primitive.
/// The wire shape matches the remote catalog and the import/export format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweakDefinition {
    pub icon: String,
    pub name: String,
    pub paths: Vec<String>,
    pub description: String,
    pub category: TweakCategory,
}

impl TweakDefinition {
    pub fn new(
        icon: &str,
        name: &str,
        paths: Vec<String>,
        description: &str,
        category: TweakCategory,
    ) -> Self {
        TweakDefinition {
            icon: icon.to_string(),
            name: name.to_string(),
            paths,
            description: description.to_string(),
            category,
        }
    }
}

/// Fallback catalog used when the remote fetch fails (no network, bad JSON).
pub const DEFAULT_TWEAKS_JSON: &str = r#"
[
  {
    "icon": "dock.rectangle",
    "name": "Hide the Dock",
    "paths": [
      "/System/Library/PrivateFrameworks/CoreMaterial.framework/dockDark.materialrecipe",
      "/System/Library/PrivateFrameworks/CoreMaterial.framework/dockLight.materialrecipe"
    ],
    "description": "Completely remove the dock background from your home screen. Tweak by @Skadz108.",
    "category": "Aesthetics"
  },
  {
    "icon": "line.3.horizontal",
    "name": "Hide the Home Bar",
    "paths": [
      "/System/Library/PrivateFrameworks/MaterialKit.framework/Assets.car"
    ],
    "description": "Remove the bottom home indicator bar. Tweak by @Skadz108.",
    "category": "Aesthetics"
  },
  {
    "icon": "folder",
    "name": "Hide Folder Backgrounds",
    "paths": [
      "/System/Library/PrivateFrameworks/SpringBoardHome.framework/folderDark.materialrecipe",
      "/System/Library/PrivateFrameworks/SpringBoardHome.framework/folderLight.materialrecipe"
    ],
    "description": "Make app folders completely transparent. Tweak by @Skadz108.",
    "category": "Aesthetics"
  },
  {
    "icon": "lock.iphone",
    "name": "Hide Unlock Background",
    "paths": [
      "/System/Library/PrivateFrameworks/CoverSheet.framework/dashBoardPasscodeBackground.materialrecipe"
    ],
    "description": "Remove the passcode entry background on the lock screen",
    "category": "Aesthetics"
  },
  {
    "icon": "bubble.left",
    "name": "Clean Message Bubbles",
    "paths": [
      "/System/Library/PrivateFrameworks/ChatKit.framework/bubbleDark.materialrecipe",
      "/System/Library/PrivateFrameworks/ChatKit.framework/bubbleLight.materialrecipe"
    ],
    "description": "Simplify the look of chat bubbles in Messages",
    "category": "Experimental"
  },
  {
    "icon": "square.stack.3d.forward.dottedline",
    "name": "Transparent Player & Notis",
    "paths": [
      "/System/Library/PrivateFrameworks/CoreMaterial.framework/platterStrokeLight.visualstyleset",
      "/System/Library/PrivateFrameworks/CoreMaterial.framework/platterStrokeDark.visualstyleset",
      "/System/Library/PrivateFrameworks/CoreMaterial.framework/plattersDark.materialrecipe",
      "/System/Library/PrivateFrameworks/SpringBoardHome.framework/folderLight.materialrecipe",
      "/System/Library/PrivateFrameworks/SpringBoardHome.framework/folderDark.materialrecipe",
      "/System/Library/PrivateFrameworks/CoreMaterial.framework/platters.materialrecipe"
    ],
    "description": "Transparent Media Player & Notifications. Tweak by @straight_tamago / mdc0",
    "category": "Aesthetics"
  },
  {
    "icon": "eye.slash.fill",
    "name": "Kill Camera Shutter Sound",
    "paths": [
      "/System/Library/Audio/UISounds/photoShutter.caf",
      "/System/Library/Audio/UISounds/begin_record.caf",
      "/System/Library/Audio/UISounds/end_record.caf",
      "/System/Library/Audio/UISounds/Modern/camera_shutter_burst.caf",
      "/System/Library/Audio/UISounds/Modern/camera_shutter_burst_begin.caf",
      "/System/Library/Audio/UISounds/Modern/camera_shutter_burst_end.caf"
    ],
    "description": "Disables camera shutter sound. Killing the Camera app may re-enable it. Tweak by @straight_tamago",
    "category": "Privacy"
  },
  {
    "icon": "eye.slash.fill",
    "name": "Kill Call Recording Sound",
    "paths": [
      "/var/mobile/Library/CallServices/Greetings/default/StartDisclosure.caf",
      "/var/mobile/Library/CallServices/Greetings/default/StartDisclosureWithTone.m4a",
      "/var/mobile/Library/CallServices/Greetings/default/StopDisclosure.caf",
      "/System/Library/PrivateFrameworks/ConversationKit.framework/call_recording_countdown.caf"
    ],
    "description": "Disables the notification sound for enabled call recording on iOS 18+. Tweak by @straight_tamago",
    "category": "Privacy"
  }
]
"#;
