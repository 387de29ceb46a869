//! Configuration types for the cut-out pipeline

use crate::error::{CutoutError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named composition of outline/shadow effects applied after layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Style {
    /// No extra styling
    None,
    /// Drop shadow only
    Soft,
    /// Ground shadow only
    Ground,
    /// White outline followed by a drop shadow
    #[default]
    Magazine,
}

impl Style {
    /// Parse a style name; unknown names select [`Style::None`]
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "magazine" => Self::Magazine,
            "soft" => Self::Soft,
            "ground" => Self::Ground,
            _ => Self::None,
        }
    }

    /// All styles in display order
    #[must_use]
    pub fn all() -> [Style; 4] {
        [Self::Magazine, Self::Soft, Self::Ground, Self::None]
    }
}

impl FromStr for Style {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<String> for Style {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Style> for String {
    fn from(style: Style) -> Self {
        style.to_string()
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Soft => write!(f, "soft"),
            Self::Ground => write!(f, "ground"),
            Self::Magazine => write!(f, "magazine"),
        }
    }
}

/// Parameters for the outline effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineParams {
    /// Number of 3x3 grow passes
    pub thickness: u32,
    /// RGBA outline colour
    pub color: [u8; 4],
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            thickness: 6,
            color: [255, 255, 255, 255],
        }
    }
}

/// Parameters for the drop shadow effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropShadowParams {
    /// Shadow offset in pixels (x, y)
    pub offset: (i32, i32),
    /// Gaussian blur radius (standard deviation) in pixels
    pub blur_radius: f32,
    /// RGBA shadow colour
    pub color: [u8; 4],
}

impl DropShadowParams {
    /// Standalone default used when the effect is invoked directly
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            offset: (15, 15),
            ..Self::default()
        }
    }
}

impl Default for DropShadowParams {
    fn default() -> Self {
        Self {
            offset: (10, 10),
            blur_radius: 20.0,
            color: [0, 0, 0, 80],
        }
    }
}

/// Parameters for the ground shadow effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundShadowParams {
    /// Multiplier applied to the accumulated shadow before clipping
    pub intensity: f32,
    /// Fraction of the image height the shadow spreads over
    pub spread: f32,
}

impl GroundShadowParams {
    /// Standalone default used when the effect is invoked directly
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            intensity: 0.5,
            ..Self::default()
        }
    }
}

impl Default for GroundShadowParams {
    fn default() -> Self {
        Self {
            intensity: 0.6,
            spread: 0.4,
        }
    }
}

/// Effect parameters used by style dispatch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleParams {
    pub outline: OutlineParams,
    pub drop_shadow: DropShadowParams,
    pub ground_shadow: GroundShadowParams,
}

/// Mask clean-up settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Binary threshold on the 0-255 scale (values >= threshold become 255)
    pub threshold: u8,
    /// Smoothing kernel size; only 5 (binomial) and 1 (disabled) are supported
    pub blur_kernel: u32,
    /// Iterations of the morphological close
    pub close_iterations: u32,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            threshold: 230,
            blur_kernel: 5,
            close_iterations: 2,
        }
    }
}

/// Crop and canvas layout settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Padding on every side of the canvas
    pub padding: u32,
    /// Crop margin as a fraction of the content bounding box
    pub margin_ratio: f32,
}

impl LayoutConfig {
    #[must_use]
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1024,
            canvas_height: 1024,
            padding: 40,
            margin_ratio: 0.05,
        }
    }
}

/// Configuration for the full pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model input size as (width, height)
    pub model_input_size: (u32, u32),
    pub mask: MaskConfig,
    pub layout: LayoutConfig,
    /// Default style when a caller does not pass one
    pub style: Style,
    /// Crop, fit to canvas and style; when false the raw cut-out is returned
    pub apply_layout: bool,
    pub effects: StyleParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_input_size: (1800, 1200),
            mask: MaskConfig::default(),
            layout: LayoutConfig::default(),
            style: Style::default(),
            apply_layout: true,
            effects: StyleParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use closet_cutout::{PipelineConfig, Style};
    ///
    /// let config = PipelineConfig::builder()
    ///     .style(Style::Soft)
    ///     .canvas_size(512, 512)
    ///     .padding(16)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.layout.canvas_width, 512);
    /// ```
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CutoutError::invalid_config(format!("Malformed JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CutoutError::input_not_found("Config", path));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        let (model_w, model_h) = self.model_input_size;
        if model_w == 0 || model_h == 0 {
            return Err(CutoutError::config_value_error(
                "model_input_size",
                format!("{}x{}", model_w, model_h),
                "both dimensions > 0",
            ));
        }

        if !matches!(self.mask.blur_kernel, 1 | 5) {
            return Err(CutoutError::config_value_error(
                "blur_kernel",
                self.mask.blur_kernel,
                "1 or 5",
            ));
        }

        let layout = &self.layout;
        if !(0.0..1.0).contains(&layout.margin_ratio) {
            return Err(CutoutError::config_value_error(
                "margin_ratio",
                layout.margin_ratio,
                "[0, 1)",
            ));
        }
        let min_side = layout.canvas_width.min(layout.canvas_height);
        if layout.padding.saturating_mul(2) >= min_side {
            return Err(CutoutError::config_value_error(
                "padding",
                layout.padding,
                "less than half the smallest canvas side",
            ));
        }

        let drop = &self.effects.drop_shadow;
        if !drop.blur_radius.is_finite() || drop.blur_radius < 0.0 {
            return Err(CutoutError::config_value_error(
                "blur_radius",
                drop.blur_radius,
                ">= 0",
            ));
        }

        let ground = &self.effects.ground_shadow;
        if !ground.intensity.is_finite() || ground.intensity < 0.0 {
            return Err(CutoutError::config_value_error(
                "intensity",
                ground.intensity,
                ">= 0",
            ));
        }
        if !(0.0..=1.0).contains(&ground.spread) {
            return Err(CutoutError::config_value_error(
                "spread",
                ground.spread,
                "[0, 1]",
            ));
        }

        Ok(())
    }
}

/// Builder for `PipelineConfig`
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn model_input_size(mut self, width: u32, height: u32) -> Self {
        self.config.model_input_size = (width, height);
        self
    }

    #[must_use]
    pub fn mask(mut self, mask: MaskConfig) -> Self {
        self.config.mask = mask;
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.mask.threshold = threshold;
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    #[must_use]
    pub fn canvas_size(mut self, width: u32, height: u32) -> Self {
        self.config.layout.canvas_width = width;
        self.config.layout.canvas_height = height;
        self
    }

    #[must_use]
    pub fn padding(mut self, padding: u32) -> Self {
        self.config.layout.padding = padding;
        self
    }

    #[must_use]
    pub fn margin_ratio(mut self, margin_ratio: f32) -> Self {
        self.config.layout.margin_ratio = margin_ratio;
        self
    }

    #[must_use]
    pub fn style(mut self, style: Style) -> Self {
        self.config.style = style;
        self
    }

    #[must_use]
    pub fn apply_layout(mut self, apply: bool) -> Self {
        self.config.apply_layout = apply;
        self
    }

    #[must_use]
    pub fn effects(mut self, effects: StyleParams) -> Self {
        self.config.effects = effects;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
