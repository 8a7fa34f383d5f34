use crate::{CommandDefinition, LengthPolicy};

use LengthPolicy::{Expression, Fixed, NulTerminated};

/// Commonly used ESC/POS commands.
///
/// No signature here is a prefix of another, so the set registers cleanly in
/// strict mode. `GS V` is declared with its short form only (`GS V m`), and
/// `GS k` with the NUL-terminated form used by barcode types 0-6.
pub fn escpos_commands() -> Vec<CommandDefinition> {
    vec![
        // Single-byte controls
        c("horizontal_tab", &[0x09], Fixed(1), "Horizontal tab"),
        c("line_feed", &[0x0A], Fixed(1), "Line feed"),
        c("form_feed", &[0x0C], Fixed(1), "Form feed"),
        c("cr_line_feed", &[0x0D], Fixed(1), "Line feed (CR)"),
        // ESC
        c("select_print_mode", &[0x1B, 0x21], Fixed(3), "Select print modes, param = bit flags"),
        c(
            "bit_image",
            &[0x1B, 0x2A],
            Expression("3 + (d(1) + d(2)*256) * (1 + 2*floor(d(0)/32))".into()),
            "Select bit-image mode; 8-dot modes (m < 32) carry 1 byte per column, 24-dot modes 3",
        ),
        c("underline", &[0x1B, 0x2D], Fixed(3), "Turn underline mode on/off, param = 0, 1, 2 dots"),
        c("init_printer", &[0x1B, 0x40], Fixed(2), "Initialize printer"),
        c(
            "set_bold",
            &[0x1B, 0x45],
            Fixed(3),
            "Turn emphasized mode on/off, param = 0 off, = 1 on",
        ),
        c("select_font", &[0x1B, 0x4D], Fixed(3), "Select font, param: A = 0, B = 1"),
        c(
            "pos_alignment",
            &[0x1B, 0x61],
            Fixed(3),
            "position alignment 0,1,2 -> left,center,right",
        ),
        c("feed_lines", &[0x1B, 0x64], Fixed(3), "Print and feed n lines"),
        c("pulse_drawer", &[0x1B, 0x70], Fixed(5), "Generate pulse on drawer kick-out connector"),
        c("select_code_table", &[0x1B, 0x74], Fixed(3), "Select character code table"),
        // GS
        c("select_char_size", &[0x1D, 0x21], Fixed(3), "Select character width and height"),
        c(
            "graphics_data",
            &[0x1D, 0x28, 0x4C],
            Expression("2 + d(0) + d(1)*256".into()),
            "Graphics data, length from pL pH",
        ),
        c(
            "store_2d_symbol_data",
            &[0x1D, 0x28, 0x6B],
            Expression("2 + d(0) + d(1)*256".into()),
            "2D symbol (QR, PDF417) function, length from pL pH",
        ),
        c("reverse_mode", &[0x1D, 0x42], Fixed(3), "Turn white/black reverse mode on/off"),
        c("hri_position", &[0x1D, 0x48], Fixed(3), "Select print position of HRI characters"),
        c(
            "cut_paper",
            &[0x1D, 0x56],
            Fixed(3),
            "cut paper, param = 0 full cut, = 1 partial cut",
        ),
        c("barcode_height", &[0x1D, 0x68], Fixed(3), "Set bar code height in dots"),
        c(
            "print_barcode_simple",
            &[0x1D, 0x6B],
            NulTerminated,
            "print bar code specs.1, NUL terminated",
        ),
        c(
            "print_raster_image",
            &[0x1D, 0x76, 0x30],
            Expression("5 + (d(1) + d(2)*256) * (d(3) + d(4)*256)".into()),
            "Print raster bit image, length from xL xH yL yH",
        ),
        c("barcode_width", &[0x1D, 0x77], Fixed(3), "Set bar code module width"),
    ]
}

fn c(id: &str, signature: &[u8], length_policy: LengthPolicy, description: &str) -> CommandDefinition {
    CommandDefinition::new(id, signature, length_policy, description)
}
