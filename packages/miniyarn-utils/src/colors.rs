use colored::{Color, Colorize};

const STRING_COLOR: Color
    = Color::TrueColor { r: 50, g: 170, b: 80 };

const NUMBER_COLOR: Color
    = Color::TrueColor { r: 255, g: 215, b: 0 };

const CODE_COLOR: Color
    = Color::TrueColor { r: 135, g: 175, b: 255 };

const PATH_COLOR: Color
    = Color::TrueColor { r: 215, g: 95, b: 215 };

const IDENT_COLOR: Color
    = Color::TrueColor { r: 215, g: 135, b: 95 };

const REFERENCE_COLOR: Color
    = Color::TrueColor { r: 135, g: 175, b: 255 };

const ERROR_COLOR: Color
    = Color::TrueColor { r: 215, g: 60, b: 60 };

pub enum DataType {
    String,
    Number,
    Code,
    Path,
    Ident,
    Reference,
    Error,
}

impl DataType {
    pub fn color(&self) -> Color {
        match self {
            DataType::String => STRING_COLOR,
            DataType::Number => NUMBER_COLOR,
            DataType::Code => CODE_COLOR,
            DataType::Path => PATH_COLOR,
            DataType::Ident => IDENT_COLOR,
            DataType::Reference => REFERENCE_COLOR,
            DataType::Error => ERROR_COLOR,
        }
    }

    pub fn colorize(&self, value: &str) -> String {
        value.color(self.color()).to_string()
    }
}
