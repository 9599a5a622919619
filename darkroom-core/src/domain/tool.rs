//! Tool chain domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a project's ordered tool chain
///
/// Positions form a dense 0..N-1 sequence within a project at all times;
/// removing an entry renumbers every entry behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChainEntry {
    pub id: Uuid,
    pub position: u32,
    pub procedure: Procedure,
    pub params: serde_json::Value,
}

/// Operation kinds implemented by the worker fleet
///
/// The `_ai` procedures are advanced operations: they are metered against the
/// owner's plan, counted once per chain entry per image of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Procedure {
    Border,
    Brightness,
    Contrast,
    Crop,
    Grayscale,
    Resize,
    Rotate,
    Watermark,
    Binarize,
    CutAi,
    UpgradeAi,
    BgRemoveAi,
    TextAi,
    ObjAi,
    PeopleAi,
}

impl Procedure {
    /// Wire name of the procedure, identical to its serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Procedure::Border => "border",
            Procedure::Brightness => "brightness",
            Procedure::Contrast => "contrast",
            Procedure::Crop => "crop",
            Procedure::Grayscale => "grayscale",
            Procedure::Resize => "resize",
            Procedure::Rotate => "rotate",
            Procedure::Watermark => "watermark",
            Procedure::Binarize => "binarize",
            Procedure::CutAi => "cut_ai",
            Procedure::UpgradeAi => "upgrade_ai",
            Procedure::BgRemoveAi => "bg_remove_ai",
            Procedure::TextAi => "text_ai",
            Procedure::ObjAi => "obj_ai",
            Procedure::PeopleAi => "people_ai",
        }
    }

    pub fn parse(s: &str) -> Option<Procedure> {
        match s {
            "border" => Some(Procedure::Border),
            "brightness" => Some(Procedure::Brightness),
            "contrast" => Some(Procedure::Contrast),
            "crop" => Some(Procedure::Crop),
            "grayscale" => Some(Procedure::Grayscale),
            "resize" => Some(Procedure::Resize),
            "rotate" => Some(Procedure::Rotate),
            "watermark" => Some(Procedure::Watermark),
            "binarize" => Some(Procedure::Binarize),
            "cut_ai" => Some(Procedure::CutAi),
            "upgrade_ai" => Some(Procedure::UpgradeAi),
            "bg_remove_ai" => Some(Procedure::BgRemoveAi),
            "text_ai" => Some(Procedure::TextAi),
            "obj_ai" => Some(Procedure::ObjAi),
            "people_ai" => Some(Procedure::PeopleAi),
            _ => None,
        }
    }

    /// Whether this procedure counts against the owner's advanced-operation quota
    pub fn is_advanced(&self) -> bool {
        matches!(
            self,
            Procedure::CutAi
                | Procedure::UpgradeAi
                | Procedure::BgRemoveAi
                | Procedure::TextAi
                | Procedure::ObjAi
                | Procedure::PeopleAi
        )
    }
}

/// Number of advanced operations a run over `image_count` images will consume
///
/// Multiplied by the image count so a single project with many images cannot
/// stretch one quota unit across unbounded work.
pub fn advanced_op_count(tools: &[ToolChainEntry], image_count: usize) -> u64 {
    let advanced = tools.iter().filter(|t| t.procedure.is_advanced()).count();
    advanced as u64 * image_count as u64
}

/// Whether the entries' positions form a dense 0..N-1 sequence
pub fn positions_are_dense(tools: &[ToolChainEntry]) -> bool {
    let mut positions: Vec<u32> = tools.iter().map(|t| t.position).collect();
    positions.sort_unstable();
    positions.iter().enumerate().all(|(i, p)| *p == i as u32)
}

/// Close the gap left by removing the entry at `removed_position`
pub fn renumber_after_removal(tools: &mut [ToolChainEntry], removed_position: u32) {
    for tool in tools.iter_mut() {
        if tool.position > removed_position {
            tool.position -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(position: u32, procedure: Procedure) -> ToolChainEntry {
        ToolChainEntry {
            id: Uuid::new_v4(),
            position,
            procedure,
            params: serde_json::json!({}),
        }
    }

    #[test]
    fn test_procedure_as_str_matches_serde() {
        for p in [
            Procedure::Border,
            Procedure::Grayscale,
            Procedure::CutAi,
            Procedure::BgRemoveAi,
            Procedure::TextAi,
        ] {
            let serialized = serde_json::to_value(p).unwrap();
            assert_eq!(serialized, serde_json::Value::String(p.as_str().into()));
            assert_eq!(Procedure::parse(p.as_str()), Some(p));
        }
    }

    #[test]
    fn test_parse_unknown_procedure() {
        assert_eq!(Procedure::parse("sharpen"), None);
    }

    #[test]
    fn test_advanced_op_count() {
        let tools = vec![
            entry(0, Procedure::Brightness),
            entry(1, Procedure::CutAi),
            entry(2, Procedure::TextAi),
        ];

        assert_eq!(advanced_op_count(&tools, 4), 8);
        assert_eq!(advanced_op_count(&tools, 0), 0);
        assert_eq!(advanced_op_count(&[], 10), 0);
    }

    #[test]
    fn test_positions_are_dense() {
        let tools = vec![entry(1, Procedure::Crop), entry(0, Procedure::Resize)];
        assert!(positions_are_dense(&tools));

        let gapped = vec![entry(0, Procedure::Crop), entry(2, Procedure::Resize)];
        assert!(!positions_are_dense(&gapped));
    }

    #[test]
    fn test_renumber_after_removal() {
        let mut tools = vec![
            entry(0, Procedure::Crop),
            entry(2, Procedure::Resize),
            entry(3, Procedure::Rotate),
        ];

        // Entry at position 1 was removed
        renumber_after_removal(&mut tools, 1);

        let positions: Vec<u32> = tools.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }
}
