mod app;
mod settings;
mod workers;

use app::App;
use settings::Settings;

/// Room under the preview for the control rows.
const CONTROLS_HEIGHT: f32 = 110.0;

fn main() -> iced::Result {
    env_logger::init();

    let settings = Settings::load();
    iced::application(App::new, App::update, App::view)
        .title("Purikura")
        .theme(App::theme)
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(
                settings.view_width,
                settings.view_height + CONTROLS_HEIGHT,
            ),
            ..Default::default()
        })
        .run()
}
