use crate::assets::path::output_path_for;
use crate::combine::compositor::{ChannelSlot, CombineRequest, Compositor};
use crate::combine::selector::ChannelSelector;
use crate::encode::sink::PersistenceSink;
use crate::foundation::core::Rgba;
use crate::foundation::error::{CombineError, CombineResult};
use crate::migrate::material::{LegacyShader, MaterialRecord};
use crate::resolve::resolver::SourceDescriptor;

/// Shader every upgraded material is switched to.
pub const TARGET_SHADER: &str = "HDRP/Lit";

pub const MASK_MAP_SUFFIX: &str = "_MaskMap";
pub const DETAIL_MAP_SUFFIX: &str = "_DetailMap";
const PACKED_EXT: &str = "png";

const RENDER_QUEUE_GEOMETRY: i32 = 2000;
const RENDER_QUEUE_ALPHA_TEST: i32 = 2450;
const RENDER_QUEUE_TRANSPARENT: i32 = 3000;

const MATERIAL_ID_STANDARD: f32 = 1.0;
const MATERIAL_ID_SPECULAR_COLOR: f32 = 4.0;

/// Defaults of the legacy shaders, used when a record omits a float.
const LEGACY_FLOAT_DEFAULTS: &[(&str, f32)] = &[
    ("_Metallic", 0.0),
    ("_Glossiness", 0.5),
    ("_GlossMapScale", 1.0),
    ("_SmoothnessTextureChannel", 0.0),
    ("_OcclusionStrength", 1.0),
    ("_Parallax", 0.02),
    ("_Mode", 0.0),
];

const FLOAT_RENAMES: &[(&str, &str)] = &[
    ("_Glossiness", "_Smoothness"),
    ("_BumpScale", "_NormalScale"),
    ("_UVSec", "_UVDetail"),
    ("_DetailNormalMapScale", "_DetailNormalScale"),
    ("_Cutoff", "_AlphaCutoff"),
];

const TEXTURE_RENAMES: &[(&str, &str)] = &[
    ("_MainTex", "_BaseColorMap"),
    ("_BumpMap", "_NormalMap"),
    ("_ParallaxMap", "_HeightMap"),
    ("_EmissionMap", "_EmissiveColorMap"),
    ("_DetailAlbedoMap", "_DetailMap"),
];

fn legacy_float(src: &MaterialRecord, name: &str) -> f32 {
    let default = LEGACY_FLOAT_DEFAULTS
        .iter()
        .find(|(n, _)| *n == name)
        .map_or(0.0, |(_, v)| *v);
    src.float_or(name, default)
}

/// Converts legacy built-in materials to `HDRP/Lit`, packing mask and detail maps on the way.
#[derive(Clone, Debug)]
pub struct MaterialUpgrader {
    compositor: Compositor,
}

impl MaterialUpgrader {
    pub fn new(compositor: Compositor) -> Self {
        Self { compositor }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Upgrade `src`, writing any packed maps through `sink`.
    ///
    /// Unassigned properties fall back to the legacy shader defaults. Any packing error aborts the
    /// upgrade, leaves `src` untouched and removes maps already written for it.
    #[tracing::instrument(skip(self, src, sink), fields(material = %src.name, shader = %src.shader))]
    pub fn upgrade(
        &self,
        src: &MaterialRecord,
        sink: &mut dyn PersistenceSink,
    ) -> CombineResult<MaterialRecord> {
        let shader = LegacyShader::from_shader_name(&src.shader).ok_or_else(|| {
            CombineError::validation(format!(
                "material '{}' uses shader '{}', which has no upgrade path to {TARGET_SHADER}",
                src.name, src.shader
            ))
        })?;

        // Probe every packing source before anything is written.
        let resolver = self.compositor.resolver();
        for path in packing_textures(shader, src) {
            resolver.resolve(&SourceDescriptor::path(path))?;
        }

        let mut dst = src.clone();
        dst.shader = TARGET_SHADER.to_owned();
        apply_renames(shader, src, &mut dst);

        let mask_map = self.pack_mask_map(shader, src, &mut dst, sink)?;

        if shader == LegacyShader::StandardSpecular && src.texture("_SpecGlossMap").is_some() {
            dst.set_color("_SpecularColor", Rgba::WHITE);
        }

        if src.texture("_ParallaxMap").is_some() {
            dst.set_float("_DisplacementMode", 2.0);
            dst.set_float("_HeightPoMAmplitude", legacy_float(src, "_Parallax") * 2.0);
        }

        if let Err(err) = self.pack_detail_map(src, &mut dst, sink) {
            if let Some(path) = &mask_map {
                discard_packed(sink, path);
            }
            return Err(err);
        }

        apply_blend_mode(legacy_float(src, "_Mode"), &mut dst);
        dst.set_color("_EmissiveColor", emissive_color(src));
        reset_keywords(&mut dst);

        tracing::info!(material = %dst.name, "upgraded to {TARGET_SHADER}");
        Ok(dst)
    }

    fn pack_mask_map(
        &self,
        shader: LegacyShader,
        src: &MaterialRecord,
        dst: &mut MaterialRecord,
        sink: &mut dyn PersistenceSink,
    ) -> CombineResult<Option<String>> {
        // Metallic
        let mut has_metallic = false;
        let mut metallic = SourceDescriptor::color(Rgba::BLACK);
        if shader.is_metallic() {
            let map = src.texture("_MetallicGlossMap");
            has_metallic = map.is_some();
            metallic = texture_or(map, Rgba::WHITE);
            let value = if has_metallic {
                1.0
            } else {
                legacy_float(src, "_Metallic").powf(2.2)
            };
            dst.set_float("_Metallic", value);
        }

        // Occlusion
        let occlusion_map = src.texture("_OcclusionMap");
        let has_occlusion = occlusion_map.is_some();
        let occlusion = texture_or(occlusion_map, Rgba::WHITE);
        dst.set_float("_AORemapMin", 1.0 - legacy_float(src, "_OcclusionStrength"));

        // Detail mask
        let detail_mask_map = src.texture("_DetailMask");
        let has_detail_mask = detail_mask_map.is_some();
        let detail_mask = texture_or(detail_mask_map, Rgba::WHITE);

        // Smoothness
        dst.set_float("_SmoothnessRemapMax", legacy_float(src, "_Glossiness"));
        let (has_smoothness, smoothness, smoothness_channel) =
            if shader == LegacyShader::StandardRoughness {
                let map = src.texture("_SpecGlossMap");
                (
                    map.is_some(),
                    texture_or(map, Rgba::WHITE),
                    ChannelSelector::LUMINANCE.inverted(),
                )
            } else {
                match src.texture(smoothness_texture(shader, src)) {
                    Some(map) => {
                        dst.set_float("_SmoothnessRemapMax", legacy_float(src, "_GlossMapScale"));
                        let resolver = self.compositor.resolver();
                        let source = if resolver.has_alpha(map)? {
                            SourceDescriptor::path(map)
                        } else {
                            tracing::debug!(texture = map, "smoothness source has no alpha");
                            SourceDescriptor::color(Rgba::WHITE)
                        };
                        (true, source, ChannelSelector::ALPHA)
                    }
                    None => (
                        false,
                        SourceDescriptor::color(Rgba::WHITE),
                        ChannelSelector::ALPHA,
                    ),
                }
            };

        if !(has_metallic || has_occlusion || has_detail_mask || has_smoothness) {
            return Ok(None);
        }

        let req = CombineRequest::new(
            ChannelSlot::new(metallic, ChannelSelector::RED),
            ChannelSlot::new(occlusion, ChannelSelector::GREEN),
            ChannelSlot::new(detail_mask, ChannelSelector::ALPHA),
            ChannelSlot::new(smoothness, smoothness_channel),
            output_path_for(&src.asset_path, MASK_MAP_SUFFIX, PACKED_EXT),
        );
        let packed = self.compositor.combine(&req, sink)?;
        dst.set_texture("_MaskMap", packed.handle.path());
        Ok(Some(packed.handle.path().to_owned()))
    }

    fn pack_detail_map(
        &self,
        src: &MaterialRecord,
        dst: &mut MaterialRecord,
        sink: &mut dyn PersistenceSink,
    ) -> CombineResult<()> {
        let albedo = src.texture("_DetailAlbedoMap");
        let normal = src.texture("_DetailNormalMap");
        if albedo.is_none() && normal.is_none() {
            return Ok(());
        }

        let req = CombineRequest::new(
            ChannelSlot::new(texture_or(albedo, Rgba::GREY), ChannelSelector::LUMINANCE),
            ChannelSlot::new(texture_or(normal, Rgba::GREY), ChannelSelector::GREEN),
            ChannelSlot::new(SourceDescriptor::color(Rgba::GREY), ChannelSelector::GREEN),
            ChannelSlot::new(texture_or(normal, Rgba::GREY), ChannelSelector::RED),
            output_path_for(&src.asset_path, DETAIL_MAP_SUFFIX, PACKED_EXT),
        );
        let packed = self.compositor.combine(&req, sink)?;
        dst.set_texture("_DetailMap", packed.handle.path());
        Ok(())
    }
}

/// Texture property whose alpha (or inverted luminance, for roughness) becomes smoothness.
fn smoothness_texture(shader: LegacyShader, src: &MaterialRecord) -> &'static str {
    match shader {
        LegacyShader::StandardRoughness => "_SpecGlossMap",
        _ if legacy_float(src, "_SmoothnessTextureChannel") != 0.0 => "_MainTex",
        LegacyShader::StandardSpecular => "_SpecGlossMap",
        LegacyShader::Standard => "_MetallicGlossMap",
    }
}

/// Assigned textures that feed the mask or detail map.
fn packing_textures(shader: LegacyShader, src: &MaterialRecord) -> Vec<&str> {
    let mut props = vec![
        "_OcclusionMap",
        "_DetailMask",
        smoothness_texture(shader, src),
        "_DetailAlbedoMap",
        "_DetailNormalMap",
    ];
    if shader.is_metallic() {
        props.push("_MetallicGlossMap");
    }
    props.sort_unstable();
    props.dedup();
    props.into_iter().filter_map(|p| src.texture(p)).collect()
}

fn discard_packed(sink: &mut dyn PersistenceSink, path: &str) {
    if let Err(e) = sink.delete_asset(path) {
        tracing::warn!(path, error = %e, "could not remove packed map of aborted upgrade");
    }
}

fn texture_or(path: Option<&str>, fallback: Rgba) -> SourceDescriptor {
    match path {
        Some(p) => SourceDescriptor::path(p),
        None => SourceDescriptor::color(fallback),
    }
}

fn apply_renames(shader: LegacyShader, src: &MaterialRecord, dst: &mut MaterialRecord) {
    for (from, to) in TEXTURE_RENAMES {
        dst.rename_texture(from, to);
    }
    for (from, to) in FLOAT_RENAMES {
        dst.rename_float(from, to);
    }
    dst.rename_color("_Color", "_BaseColor");
    dst.set_float("_LinkDetailsWithBase", 0.0);
    let alpha_test = src.has_keyword("_ALPHATEST_ON");
    dst.set_float("_AlphaCutoffEnable", if alpha_test { 1.0 } else { 0.0 });

    match shader {
        LegacyShader::Standard => dst.set_float("_MaterialID", MATERIAL_ID_STANDARD),
        LegacyShader::StandardSpecular => {
            dst.set_float("_MaterialID", MATERIAL_ID_SPECULAR_COLOR);
            dst.rename_color("_SpecColor", "_SpecularColor");
            dst.rename_texture("_SpecGlossMap", "_SpecularColorMap");
        }
        LegacyShader::StandardRoughness => {}
    }
}

/// Legacy `_Mode`: 0 opaque, 1 cutout, 2 fade, 3 transparent. Other values leave blending alone.
fn apply_blend_mode(mode: f32, dst: &mut MaterialRecord) {
    // (surface type, alpha cutoff, preserve specular, depth prepass, render queue)
    let (surface, cutoff, preserve_specular, prepass, queue) = match mode as i32 {
        0 => (0.0, 0.0, 1.0, None, RENDER_QUEUE_GEOMETRY),
        1 => (0.0, 1.0, 1.0, None, RENDER_QUEUE_ALPHA_TEST),
        2 => (1.0, 0.0, 0.0, Some(1.0), RENDER_QUEUE_TRANSPARENT),
        3 => (1.0, 0.0, 1.0, None, RENDER_QUEUE_TRANSPARENT),
        other => {
            tracing::warn!(mode = other, "unknown legacy blend mode; left unchanged");
            return;
        }
    };
    dst.set_float("_SurfaceType", surface);
    dst.set_float("_BlendMode", 0.0);
    dst.set_float("_AlphaCutoffEnable", cutoff);
    dst.set_float("_EnableBlendModePreserveSpecularLighting", preserve_specular);
    if let Some(v) = prepass {
        dst.set_float("_TransparentDepthPrepassEnable", v);
    }
    dst.render_queue = Some(queue);
}

fn emissive_color(src: &MaterialRecord) -> Rgba {
    let enabled = src.has_keyword("_EMISSION") && src.float("_EmissionEnabled") != Some(0.0);
    if enabled {
        src.color("_EmissionColor").unwrap_or(Rgba::BLACK)
    } else {
        Rgba::BLACK
    }
}

/// Recompute the target shader's keywords from its properties.
fn reset_keywords(dst: &mut MaterialRecord) {
    dst.keywords.clear();
    let flags = [
        ("_ALPHATEST_ON", dst.float("_AlphaCutoffEnable") == Some(1.0)),
        ("_SURFACE_TYPE_TRANSPARENT", dst.float("_SurfaceType") == Some(1.0)),
        (
            "_MATERIAL_FEATURE_SPECULAR_COLOR",
            dst.float("_MaterialID") == Some(MATERIAL_ID_SPECULAR_COLOR),
        ),
        ("_NORMALMAP", dst.texture("_NormalMap").is_some()),
        ("_MASKMAP", dst.texture("_MaskMap").is_some()),
        ("_DETAIL_MAP", dst.texture("_DetailMap").is_some()),
        ("_HEIGHTMAP", dst.texture("_HeightMap").is_some()),
        ("_EMISSIVE_COLOR_MAP", dst.texture("_EmissiveColorMap").is_some()),
        ("_SPECULARCOLORMAP", dst.texture("_SpecularColorMap").is_some()),
    ];
    for (kw, on) in flags {
        dst.set_keyword(kw, on);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/migrate/upgrader.rs"]
mod tests;
