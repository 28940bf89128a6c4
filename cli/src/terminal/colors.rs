use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 110, g: 200, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 190, b: 90 };
pub const SEPARATOR: Color = Color::TrueColor { r: 100, g: 100, b: 110 };
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 210, g: 210, b: 215 };
pub const PORT: Color = Color::TrueColor { r: 140, g: 230, b: 140 };
pub const TECH: Color = Color::TrueColor { r: 200, g: 160, b: 255 };
pub const FINDING: Color = Color::TrueColor { r: 255, g: 110, b: 110 };
