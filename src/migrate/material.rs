use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::assets::color::ColorDef;
use crate::foundation::core::Rgba;
use crate::foundation::error::{CombineError, CombineResult};

/// UV tiling (`scale`) and `offset` applied to one texture property.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextureTransform {
    #[serde(default = "TextureTransform::unit_scale")]
    pub scale: [f32; 2],
    #[serde(default)]
    pub offset: [f32; 2],
}

impl TextureTransform {
    pub const IDENTITY: Self = Self {
        scale: [1.0, 1.0],
        offset: [0.0, 0.0],
    };

    fn unit_scale() -> [f32; 2] {
        [1.0, 1.0]
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A material as a flat, name-keyed property bag.
///
/// Texture values are paths relative to the project root. Every map is ordered so that a record
/// serializes the same way every time.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialRecord {
    pub name: String,
    pub shader: String,
    /// Location of the material asset itself; packed maps are written next to it.
    pub asset_path: String,
    #[serde(default)]
    pub floats: BTreeMap<String, f32>,
    #[serde(default)]
    pub colors: BTreeMap<String, ColorDef>,
    #[serde(default)]
    pub textures: BTreeMap<String, String>,
    /// Tiling and offset per texture property. Properties without an entry use the identity.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub texture_transforms: BTreeMap<String, TextureTransform>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_queue: Option<i32>,
}

impl MaterialRecord {
    pub fn new(
        name: impl Into<String>,
        shader: impl Into<String>,
        asset_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            asset_path: asset_path.into(),
            ..Self::default()
        }
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> CombineResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| CombineError::validation(format!("parse material JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> CombineResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CombineError::validation(format!("open material '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn to_json_pretty(&self) -> CombineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("serialize material '{}': {e}", self.name).into())
    }

    /// Whether any property table (float, color or texture) has `name`.
    pub fn has_property(&self, name: &str) -> bool {
        self.floats.contains_key(name)
            || self.colors.contains_key(name)
            || self.textures.contains_key(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn float_or(&self, name: &str, default: f32) -> f32 {
        self.float(name).unwrap_or(default)
    }

    pub fn set_float(&mut self, name: &str, v: f32) {
        self.floats.insert(name.to_owned(), v);
    }

    pub fn color(&self, name: &str) -> Option<Rgba> {
        self.colors.get(name).map(|c| c.to_rgba())
    }

    pub fn set_color(&mut self, name: &str, c: Rgba) {
        self.colors.insert(name.to_owned(), ColorDef::from(c));
    }

    /// Assigned texture path. Empty strings count as unassigned.
    pub fn texture(&self, name: &str) -> Option<&str> {
        self.textures
            .get(name)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    pub fn set_texture(&mut self, name: &str, path: impl Into<String>) {
        self.textures.insert(name.to_owned(), path.into());
    }

    /// Tiling and offset of a texture property.
    pub fn texture_transform(&self, name: &str) -> TextureTransform {
        self.texture_transforms
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_texture_transform(&mut self, name: &str, t: TextureTransform) {
        self.texture_transforms.insert(name.to_owned(), t);
    }

    pub fn has_keyword(&self, kw: &str) -> bool {
        self.keywords.contains(kw)
    }

    pub fn set_keyword(&mut self, kw: &str, enabled: bool) {
        if enabled {
            self.keywords.insert(kw.to_owned());
        } else {
            self.keywords.remove(kw);
        }
    }

    /// Move a float to a new name. Absent sources leave the record untouched.
    pub fn rename_float(&mut self, from: &str, to: &str) {
        if let Some(v) = self.floats.remove(from) {
            self.floats.insert(to.to_owned(), v);
        }
    }

    pub fn rename_color(&mut self, from: &str, to: &str) {
        if let Some(v) = self.colors.remove(from) {
            self.colors.insert(to.to_owned(), v);
        }
    }

    /// Move a texture and its tiling/offset to a new name.
    pub fn rename_texture(&mut self, from: &str, to: &str) {
        if let Some(v) = self.textures.remove(from) {
            self.textures.insert(to.to_owned(), v);
        }
        if let Some(t) = self.texture_transforms.remove(from) {
            self.texture_transforms.insert(to.to_owned(), t);
        }
    }
}

/// Built-in shader families the upgrader knows how to convert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegacyShader {
    /// Metallic workflow.
    Standard,
    /// Specular workflow.
    StandardSpecular,
    /// Metallic workflow with a roughness map in place of smoothness.
    StandardRoughness,
}

impl LegacyShader {
    pub fn from_shader_name(name: &str) -> Option<Self> {
        match name {
            "Standard" => Some(Self::Standard),
            "Standard (Specular setup)" => Some(Self::StandardSpecular),
            "Autodesk Interactive" | "Standard (Roughness setup)" => Some(Self::StandardRoughness),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::StandardSpecular => "Standard (Specular setup)",
            Self::StandardRoughness => "Autodesk Interactive",
        }
    }

    /// Whether the shader exposes `_Metallic` / `_MetallicGlossMap`.
    pub fn is_metallic(self) -> bool {
        matches!(self, Self::Standard | Self::StandardRoughness)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/migrate/material.rs"]
mod tests;
