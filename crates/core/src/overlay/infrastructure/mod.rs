pub mod cpu_compositor;
pub mod image_asset_loader;
