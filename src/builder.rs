use tracing::info;

use crate::container::Container;
use crate::layer::{BaseParameters, CombinedLevel};

/// Wraps assembled levels in an array container.
///
/// Header fields come from the base parameters; `pixelDepth` is 0 because an
/// array is not a volume. Nothing is checked here, the inputs were validated
/// during assembly.
pub fn build(layer_count: usize, base: &BaseParameters, levels: Vec<CombinedLevel>) -> Container {
    let container = Container {
        vk_format: base.format,
        type_size: base.type_size,
        pixel_width: base.width,
        pixel_height: base.height,
        pixel_depth: 0,
        layer_count: layer_count as u32,
        face_count: 1,
        level_count: levels.len() as u32,
        supercompression_scheme: base.supercompression_scheme,
        levels,
        dfd: base.dfd.clone(),
        key_value: base.key_value.clone().unwrap_or_default(),
        global_data: None,
    };

    info!(
        layers = container.layer_count,
        levels = container.level_count,
        width = container.pixel_width,
        height = container.pixel_height,
        format = %container.vk_format,
        "Built array container"
    );
    container
}
