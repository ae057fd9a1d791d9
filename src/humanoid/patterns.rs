//! Accepted bone-name patterns per role.
//!
//! Covers plain English rig names, the "J_Bip_" / "J_Adj_" dialect and
//! "Normalized_" proxy nodes. The table is compiled once on first use.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::bone::{BoneRole, BODY_ROLES};

/// How a bone name relates to the role it is mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Bone is literally named after the role
    Exact,
    /// Matched one of the role's accepted patterns
    Pattern(String),
    Unmatched,
}

impl NameMatch {
    pub fn is_match(&self) -> bool {
        !matches!(self, NameMatch::Unmatched)
    }
}

fn body_patterns(role: BoneRole) -> &'static [&'static str] {
    match role {
        BoneRole::Hips => &["hip", "pelvis", "J_Bip_C_Hips", "Normalized_.*_Hips"],
        BoneRole::Spine => &["spine", "J_Bip_C_Spine", "Normalized_.*_Spine"],
        BoneRole::Chest => &["chest", "J_Bip_C_Chest", "Normalized_.*_Chest"],
        BoneRole::UpperChest => &[
            "upperchest",
            "upper_chest",
            "J_Bip_C_UpperChest",
            "Normalized_.*_UpperChest",
        ],
        BoneRole::Neck => &["neck", "J_Bip_C_Neck", "Normalized_.*_Neck"],
        BoneRole::Head => &["head", "J_Bip_C_Head", "Normalized_.*_Head"],
        BoneRole::LeftEye => &["left.*eye", "eye.*left", "J_Adj_L_FaceEye", "Normalized_.*_LeftEye"],
        BoneRole::RightEye => &[
            "right.*eye",
            "eye.*right",
            "J_Adj_R_FaceEye",
            "Normalized_.*_RightEye",
        ],
        BoneRole::Jaw => &["jaw", "J_Adj_C_FaceJaw", "Normalized_.*_Jaw"],
        BoneRole::LeftUpperLeg => &[
            "left.*upper.*leg",
            "left.*thigh",
            "J_Bip_L_UpperLeg",
            "Normalized_.*_LeftUpperLeg",
        ],
        BoneRole::LeftLowerLeg => &[
            "left.*lower.*leg",
            "left.*shin",
            "left.*calf",
            "J_Bip_L_LowerLeg",
            "Normalized_.*_LeftLowerLeg",
        ],
        BoneRole::LeftFoot => &["left.*foot", "left.*ankle", "J_Bip_L_Foot", "Normalized_.*_LeftFoot"],
        BoneRole::LeftToes => &["left.*toe", "J_Bip_L_ToeBase", "Normalized_.*_LeftToes"],
        BoneRole::RightUpperLeg => &[
            "right.*upper.*leg",
            "right.*thigh",
            "J_Bip_R_UpperLeg",
            "Normalized_.*_RightUpperLeg",
        ],
        BoneRole::RightLowerLeg => &[
            "right.*lower.*leg",
            "right.*shin",
            "right.*calf",
            "J_Bip_R_LowerLeg",
            "Normalized_.*_RightLowerLeg",
        ],
        BoneRole::RightFoot => &[
            "right.*foot",
            "right.*ankle",
            "J_Bip_R_Foot",
            "Normalized_.*_RightFoot",
        ],
        BoneRole::RightToes => &["right.*toe", "J_Bip_R_ToeBase", "Normalized_.*_RightToes"],
        BoneRole::LeftShoulder => &["left.*shoulder", "J_Bip_L_Shoulder", "Normalized_.*_LeftShoulder"],
        BoneRole::LeftUpperArm => &["left.*upper.*arm", "J_Bip_L_UpperArm", "Normalized_.*_LeftUpperArm"],
        BoneRole::LeftLowerArm => &[
            "left.*lower.*arm",
            "left.*forearm",
            "J_Bip_L_LowerArm",
            "Normalized_.*_LeftLowerArm",
        ],
        BoneRole::LeftHand => &["left.*hand", "left.*wrist", "J_Bip_L_Hand", "Normalized_.*_LeftHand"],
        BoneRole::RightShoulder => &[
            "right.*shoulder",
            "J_Bip_R_Shoulder",
            "Normalized_.*_RightShoulder",
        ],
        BoneRole::RightUpperArm => &[
            "right.*upper.*arm",
            "J_Bip_R_UpperArm",
            "Normalized_.*_RightUpperArm",
        ],
        BoneRole::RightLowerArm => &[
            "right.*lower.*arm",
            "right.*forearm",
            "J_Bip_R_LowerArm",
            "Normalized_.*_RightLowerArm",
        ],
        BoneRole::RightHand => &[
            "right.*hand",
            "right.*wrist",
            "J_Bip_R_Hand",
            "Normalized_.*_RightHand",
        ],
        BoneRole::Finger(..) => &[],
    }
}

/// Finger patterns are generated: "left.*index.*proximal", "J_Bip_L_Index1",
/// "Normalized_.*_LeftIndexProximal".
fn finger_patterns(role: BoneRole) -> Vec<String> {
    let BoneRole::Finger(side, finger, joint) = role else {
        return Vec::new();
    };
    let bip_finger = capitalize(finger.as_str());
    vec![
        format!("{}.*{}.*{}", side.as_str(), finger.as_str(), joint.as_str()),
        format!(
            "J_Bip_{}_{}{}",
            side.letter().to_uppercase(),
            bip_finger,
            joint.number()
        ),
        format!("Normalized_.*_{}", capitalize(role.name())),
    ]
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){}", pattern)) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid bone name pattern {:?}: {}", pattern, e);
            None
        }
    }
}

fn table() -> &'static HashMap<BoneRole, Vec<Regex>> {
    static TABLE: OnceLock<HashMap<BoneRole, Vec<Regex>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map = HashMap::with_capacity(BoneRole::COUNT);
        for role in BODY_ROLES {
            map.insert(role, body_patterns(role).iter().filter_map(|p| compile(p)).collect());
        }
        for role in BoneRole::fingers() {
            map.insert(role, finger_patterns(role).iter().filter_map(|p| compile(p)).collect());
        }
        map
    })
}

/// Classify `bone_name` against the accepted names for `role`.
pub fn match_bone_name(role: BoneRole, bone_name: &str) -> NameMatch {
    if bone_name == role.name() {
        return NameMatch::Exact;
    }
    table()
        .get(&role)
        .and_then(|patterns| patterns.iter().find(|re| re.is_match(bone_name)))
        .map(|re| NameMatch::Pattern(re.as_str().trim_start_matches("(?i)").to_string()))
        .unwrap_or(NameMatch::Unmatched)
}
