pub mod capture {
    pub mod domain {
        pub mod capture_config;
        pub mod capture_error;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod domain {
        pub mod decorative_image;
        pub mod face_frame;
        pub mod overlay_renderer;
        pub mod render_surface;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod live_overlay_use_case;
    pub mod overlay_presenter;
    pub mod pipeline_logger;
    pub mod startup;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod geometry;
}
