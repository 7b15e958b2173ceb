pub mod dominant_color;
