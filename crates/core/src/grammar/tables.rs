pub use escpos_toolchain_command_tables::{
    CommandDefinition, CommandTable, LengthPolicy, TABLE_FORMAT_VERSION, TableError, builtin, hex,
};
