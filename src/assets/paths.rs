//! Deterministic asset locations under the image root.
//!
//! ```text
//! <root>/loading-screen/<championId>.jpg
//! <root>/thumbnails/<championId>/<number>.jpg
//! <root>/high-res/<skinId>.jpg
//! ```

use std::path::{Path, PathBuf};

pub const LOADING_SCREEN_DIR: &str = "loading-screen";
pub const THUMBNAILS_DIR: &str = "thumbnails";
pub const HIGH_RES_DIR: &str = "high-res";

const EXTENSION: &str = "jpg";

pub fn loading_screen_path(root: &Path, champion_id: &str) -> PathBuf {
    root.join(LOADING_SCREEN_DIR)
        .join(format!("{}.{EXTENSION}", clean_component(champion_id)))
}

pub fn thumbnail_path(root: &Path, champion_id: &str, number: u32) -> PathBuf {
    root.join(THUMBNAILS_DIR)
        .join(clean_component(champion_id))
        .join(format!("{number}.{EXTENSION}"))
}

pub fn high_res_path(root: &Path, skin_id: u32) -> PathBuf {
    root.join(HIGH_RES_DIR).join(format!("{skin_id}.{EXTENSION}"))
}

/// Strip characters that would let a remote id escape its directory or be
/// rejected by common filesystems.
pub fn clean_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        // "", "." and ".." all collapse to a harmless placeholder.
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let root = Path::new("/data/images");
        assert_eq!(
            loading_screen_path(root, "Aatrox"),
            PathBuf::from("/data/images/loading-screen/Aatrox.jpg")
        );
        assert_eq!(
            thumbnail_path(root, "Aatrox", 2),
            PathBuf::from("/data/images/thumbnails/Aatrox/2.jpg")
        );
        assert_eq!(
            high_res_path(root, 901),
            PathBuf::from("/data/images/high-res/901.jpg")
        );
    }

    #[test]
    fn test_clean_component_blocks_traversal() {
        assert_eq!(clean_component("../etc"), "..etc");
        assert_eq!(clean_component(".."), "_");
        assert_eq!(clean_component(""), "_");
        assert_eq!(clean_component("Kai'Sa"), "Kai'Sa");
        assert_eq!(clean_component("a/b\\c:d"), "abcd");
    }
}
