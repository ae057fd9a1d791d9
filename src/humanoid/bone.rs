//! Canonical humanoid bone roles and the static role tables built on them.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// Single-letter abbreviation used by many rigs ("l" / "r")
    pub fn letter(self) -> &'static str {
        match self {
            Side::Left => "l",
            Side::Right => "r",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Little => "little",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FingerJoint {
    Proximal,
    Intermediate,
    Distal,
}

impl FingerJoint {
    pub const ALL: [FingerJoint; 3] = [
        FingerJoint::Proximal,
        FingerJoint::Intermediate,
        FingerJoint::Distal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FingerJoint::Proximal => "proximal",
            FingerJoint::Intermediate => "intermediate",
            FingerJoint::Distal => "distal",
        }
    }

    /// 1-based segment number used by "_Bip_" style rigs
    pub fn number(self) -> u8 {
        match self {
            FingerJoint::Proximal => 1,
            FingerJoint::Intermediate => 2,
            FingerJoint::Distal => 3,
        }
    }
}

/// A semantic joint identity independent of any rig's actual bone name.
///
/// Finger roles use the Proximal / Intermediate / Distal segmentation for
/// every finger including the thumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoneRole {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftEye,
    RightEye,
    Jaw,

    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,

    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,

    Finger(Side, Finger, FingerJoint),
}

/// Body (non-finger) roles in schema order
pub const BODY_ROLES: [BoneRole; 25] = [
    BoneRole::Hips,
    BoneRole::Spine,
    BoneRole::Chest,
    BoneRole::UpperChest,
    BoneRole::Neck,
    BoneRole::Head,
    BoneRole::LeftEye,
    BoneRole::RightEye,
    BoneRole::Jaw,
    BoneRole::LeftShoulder,
    BoneRole::LeftUpperArm,
    BoneRole::LeftLowerArm,
    BoneRole::LeftHand,
    BoneRole::RightShoulder,
    BoneRole::RightUpperArm,
    BoneRole::RightLowerArm,
    BoneRole::RightHand,
    BoneRole::LeftUpperLeg,
    BoneRole::LeftLowerLeg,
    BoneRole::LeftFoot,
    BoneRole::LeftToes,
    BoneRole::RightUpperLeg,
    BoneRole::RightLowerLeg,
    BoneRole::RightFoot,
    BoneRole::RightToes,
];

/// Roles that must be mapped for a character to pass bone-mapping validation.
pub const REQUIRED_ROLES: [BoneRole; 23] = [
    BoneRole::Hips,
    BoneRole::Spine,
    BoneRole::Chest,
    BoneRole::Neck,
    BoneRole::Head,
    BoneRole::LeftEye,
    BoneRole::RightEye,
    BoneRole::LeftUpperLeg,
    BoneRole::LeftLowerLeg,
    BoneRole::LeftFoot,
    BoneRole::LeftToes,
    BoneRole::RightUpperLeg,
    BoneRole::RightLowerLeg,
    BoneRole::RightFoot,
    BoneRole::RightToes,
    BoneRole::LeftShoulder,
    BoneRole::LeftUpperArm,
    BoneRole::LeftLowerArm,
    BoneRole::LeftHand,
    BoneRole::RightShoulder,
    BoneRole::RightUpperArm,
    BoneRole::RightLowerArm,
    BoneRole::RightHand,
];

/// Bones an animation needs: torso, full arms, full legs. No fingers, jaw, eyes or toes.
pub const ESSENTIAL_ANIMATION_ROLES: [BoneRole; 19] = [
    BoneRole::Hips,
    BoneRole::Spine,
    BoneRole::Chest,
    BoneRole::Neck,
    BoneRole::Head,
    BoneRole::LeftShoulder,
    BoneRole::LeftUpperArm,
    BoneRole::LeftLowerArm,
    BoneRole::LeftHand,
    BoneRole::RightShoulder,
    BoneRole::RightUpperArm,
    BoneRole::RightLowerArm,
    BoneRole::RightHand,
    BoneRole::LeftUpperLeg,
    BoneRole::LeftLowerLeg,
    BoneRole::LeftFoot,
    BoneRole::RightUpperLeg,
    BoneRole::RightLowerLeg,
    BoneRole::RightFoot,
];

/// Chain synthesized by skeleton repair when links are missing.
pub const MINIMAL_CHAIN: [BoneRole; 5] = [
    BoneRole::Hips,
    BoneRole::Spine,
    BoneRole::Chest,
    BoneRole::Neck,
    BoneRole::Head,
];

/// Torso chain; upperChest is optional.
pub const MAIN_CHAIN: [BoneRole; 6] = [
    BoneRole::Hips,
    BoneRole::Spine,
    BoneRole::Chest,
    BoneRole::UpperChest,
    BoneRole::Neck,
    BoneRole::Head,
];

/// Ancestor chains checked by hierarchy validation.
pub const SKELETON_CHAINS: [&[BoneRole]; 5] = [
    &MAIN_CHAIN,
    &[
        BoneRole::Hips,
        BoneRole::LeftUpperLeg,
        BoneRole::LeftLowerLeg,
        BoneRole::LeftFoot,
        BoneRole::LeftToes,
    ],
    &[
        BoneRole::Hips,
        BoneRole::RightUpperLeg,
        BoneRole::RightLowerLeg,
        BoneRole::RightFoot,
        BoneRole::RightToes,
    ],
    &[
        BoneRole::Chest,
        BoneRole::LeftShoulder,
        BoneRole::LeftUpperArm,
        BoneRole::LeftLowerArm,
        BoneRole::LeftHand,
    ],
    &[
        BoneRole::Chest,
        BoneRole::RightShoulder,
        BoneRole::RightUpperArm,
        BoneRole::RightLowerArm,
        BoneRole::RightHand,
    ],
];

// [side][finger][joint]
const FINGER_NAMES: [[[&str; 3]; 5]; 2] = [
    [
        ["leftThumbProximal", "leftThumbIntermediate", "leftThumbDistal"],
        ["leftIndexProximal", "leftIndexIntermediate", "leftIndexDistal"],
        ["leftMiddleProximal", "leftMiddleIntermediate", "leftMiddleDistal"],
        ["leftRingProximal", "leftRingIntermediate", "leftRingDistal"],
        ["leftLittleProximal", "leftLittleIntermediate", "leftLittleDistal"],
    ],
    [
        ["rightThumbProximal", "rightThumbIntermediate", "rightThumbDistal"],
        ["rightIndexProximal", "rightIndexIntermediate", "rightIndexDistal"],
        ["rightMiddleProximal", "rightMiddleIntermediate", "rightMiddleDistal"],
        ["rightRingProximal", "rightRingIntermediate", "rightRingDistal"],
        ["rightLittleProximal", "rightLittleIntermediate", "rightLittleDistal"],
    ],
];

impl BoneRole {
    /// Number of roles in the schema (body + fingers)
    pub const COUNT: usize = BODY_ROLES.len() + 30;

    /// Every role: body roles first, then fingers ordered side, finger, joint.
    pub fn all() -> impl Iterator<Item = BoneRole> {
        BODY_ROLES.into_iter().chain(Self::fingers())
    }

    pub fn fingers() -> impl Iterator<Item = BoneRole> {
        Side::ALL.into_iter().flat_map(|side| {
            Finger::ALL.into_iter().flat_map(move |finger| {
                FingerJoint::ALL
                    .into_iter()
                    .map(move |joint| BoneRole::Finger(side, finger, joint))
            })
        })
    }

    /// camelCase role name ("leftUpperArm")
    pub fn name(self) -> &'static str {
        match self {
            BoneRole::Hips => "hips",
            BoneRole::Spine => "spine",
            BoneRole::Chest => "chest",
            BoneRole::UpperChest => "upperChest",
            BoneRole::Neck => "neck",
            BoneRole::Head => "head",
            BoneRole::LeftEye => "leftEye",
            BoneRole::RightEye => "rightEye",
            BoneRole::Jaw => "jaw",
            BoneRole::LeftShoulder => "leftShoulder",
            BoneRole::LeftUpperArm => "leftUpperArm",
            BoneRole::LeftLowerArm => "leftLowerArm",
            BoneRole::LeftHand => "leftHand",
            BoneRole::RightShoulder => "rightShoulder",
            BoneRole::RightUpperArm => "rightUpperArm",
            BoneRole::RightLowerArm => "rightLowerArm",
            BoneRole::RightHand => "rightHand",
            BoneRole::LeftUpperLeg => "leftUpperLeg",
            BoneRole::LeftLowerLeg => "leftLowerLeg",
            BoneRole::LeftFoot => "leftFoot",
            BoneRole::LeftToes => "leftToes",
            BoneRole::RightUpperLeg => "rightUpperLeg",
            BoneRole::RightLowerLeg => "rightLowerLeg",
            BoneRole::RightFoot => "rightFoot",
            BoneRole::RightToes => "rightToes",
            BoneRole::Finger(side, finger, joint) => {
                FINGER_NAMES[side as usize][finger as usize][joint as usize]
            }
        }
    }

    /// Parse a role name. Accepts the VRM 1.0 thumb names
    /// (Metacarpal / Proximal / Distal) and maps them onto our segmentation.
    pub fn from_name(name: &str) -> Option<BoneRole> {
        if let Some(role) = Self::all().find(|r| r.name() == name) {
            return Some(role);
        }

        let (side, rest) = if let Some(rest) = name.strip_prefix("leftThumb") {
            (Side::Left, rest)
        } else if let Some(rest) = name.strip_prefix("rightThumb") {
            (Side::Right, rest)
        } else {
            return None;
        };
        match rest {
            "Metacarpal" => Some(BoneRole::Finger(side, Finger::Thumb, FingerJoint::Proximal)),
            _ => None,
        }
    }

    /// Like [`from_name`](Self::from_name) but for VRM 1.0 files, where
    /// thumb Proximal means our Intermediate.
    pub fn from_vrm1_name(name: &str) -> Option<BoneRole> {
        for side in Side::ALL {
            let prefix = match side {
                Side::Left => "leftThumb",
                Side::Right => "rightThumb",
            };
            if let Some(rest) = name.strip_prefix(prefix) {
                let joint = match rest {
                    "Metacarpal" => FingerJoint::Proximal,
                    "Proximal" => FingerJoint::Intermediate,
                    "Distal" => FingerJoint::Distal,
                    _ => return None,
                };
                return Some(BoneRole::Finger(side, Finger::Thumb, joint));
            }
        }
        Self::from_name(name)
    }

    /// snake_case variant of the role name ("left_upper_arm")
    pub fn snake_name(self) -> String {
        camel_to_snake(self.name())
    }

    pub fn side(self) -> Option<Side> {
        let name = self.name();
        if name.starts_with("left") {
            Some(Side::Left)
        } else if name.starts_with("right") {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn is_finger(self) -> bool {
        matches!(self, BoneRole::Finger(..))
    }

    pub fn is_required(self) -> bool {
        REQUIRED_ROLES.contains(&self)
    }

    pub fn hand(side: Side) -> BoneRole {
        match side {
            Side::Left => BoneRole::LeftHand,
            Side::Right => BoneRole::RightHand,
        }
    }

    pub fn upper_arm(side: Side) -> BoneRole {
        match side {
            Side::Left => BoneRole::LeftUpperArm,
            Side::Right => BoneRole::RightUpperArm,
        }
    }
}

impl fmt::Display for BoneRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for BoneRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// "leftUpperArm" -> "left_upper_arm"
pub fn camel_to_snake(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            result.push('_');
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
