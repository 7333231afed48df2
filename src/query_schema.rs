//! query_schema.rs — Schema and prompt definitions for the container inventory table.
//!
//! The language model never sees the database directly: it receives the column
//! list below and must answer with query syntax only. Column names are the
//! spellings used by the depot export, dots and spaces included.

/// Default table holding one row per container.
pub const DEFAULT_TABLE_NAME: &str = "data_all";

pub const COL_STATE: &str = "STATE";
pub const COL_CONTAINER: &str = "CONTAINER";
pub const COL_STATUS_DATE: &str = "TGL. STATUS";
pub const COL_DAYS_COUNT: &str = "JML. HARI";
pub const COL_OWNER: &str = "OWNER";
pub const COL_BOOKING_NO: &str = "BOOKNO";
pub const COL_LOGISTIC: &str = "LOGISTIC";
pub const COL_LAST_VESSEL: &str = "VESSEL TERAKHIR";
pub const COL_FIXED_DATE: &str = "TGL FXD";
pub const COL_YARD_BLOCK: &str = "CY BLOCK";
pub const COL_OPERATION_ID: &str = "OPB ID";
pub const COL_LAST_SHIPPER: &str = "SHIP. TERAKHIR";
pub const COL_LAST_CONSIGNEE: &str = "CONS. TERAKHIR";
pub const COL_LAST_CARGO: &str = "CARGO TERAKHIR";
pub const COL_TYPE: &str = "TYPE";
pub const COL_LOCATION: &str = "LOKASI";
pub const COL_REMARK: &str = "REMARK";
pub const COL_FINDING_DAMAGE: &str = "FINDING DAMAGE";
pub const COL_CROSS_CHECK: &str = "CROSS CHECK";
pub const COL_FREE_USER: &str = "MLO FREEUSER";
pub const COL_USER_ID: &str = "USER_ID";
pub const COL_SEAL_NO: &str = "NO. SEAL";
pub const COL_GRADE: &str = "CONTAINER GRADE";

/// All 23 columns in table order.
pub const COLUMNS: [&str; 23] = [
    COL_STATE,
    COL_CONTAINER,
    COL_STATUS_DATE,
    COL_DAYS_COUNT,
    COL_OWNER,
    COL_BOOKING_NO,
    COL_LOGISTIC,
    COL_LAST_VESSEL,
    COL_FIXED_DATE,
    COL_YARD_BLOCK,
    COL_OPERATION_ID,
    COL_LAST_SHIPPER,
    COL_LAST_CONSIGNEE,
    COL_LAST_CARGO,
    COL_TYPE,
    COL_LOCATION,
    COL_REMARK,
    COL_FINDING_DAMAGE,
    COL_CROSS_CHECK,
    COL_FREE_USER,
    COL_USER_ID,
    COL_SEAL_NO,
    COL_GRADE,
];

/// Columns the pivot and recap stages cannot work without.
pub const PIVOT_COLUMNS: [&str; 4] = [COL_LOCATION, COL_STATE, COL_TYPE, COL_GRADE];

/// DDL for a SQLite copy of the inventory table. Used by `init-db` and tests.
pub fn create_table_sql(table: &str) -> String {
    let cols = COLUMNS
        .iter()
        .map(|c| {
            let ty = if *c == COL_DAYS_COUNT { "INTEGER" } else { "TEXT" };
            format!("    \"{}\" {}", c, ty)
        })
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n);", table, cols)
}

/// System prompt for the query model: query syntax only, no prose.
pub fn build_query_system_prompt(table: &str) -> String {
    let attrs = COLUMNS
        .iter()
        .map(|c| format!("'{}'", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a helpful assistant that generates only SQL query syntax. \
         The table is named '{table}' and contains the following attributes: {attrs}. \
         Return only the SQL query based on the input, adjusting the date format to match \
         the user input, without any additional explanation or words."
    )
}

/// Human turn for the query model, wrapping the normalized phrase.
pub fn build_query_user_prompt(phrase: &str) -> String {
    format!(
        "input:\n{phrase}\n Please generate only the SQL query syntax based on the request, \
         and ensure the date format matches the user input (whether it's DD/MM/YYYY or DD-MM-YYYY). \
         Output only the query without redundant explanation or additional text."
    )
}

/// System prompt for the narrative model.
pub fn build_summary_system_prompt(language: &str) -> String {
    format!(
        "You are a helpful assistant that is very proficient at generating a paragraph summary \
         of the information derived from analysis based on a database table containing \
         information about container shipping. \
         You must use the {language} language; otherwise, you will be punished for not speaking in {language}. \
         Do not explain abbreviations or acronyms; simply include them as they are. \
         Don't forget to format the response using HTML tags such as <p>, <ul>, <li>, etc., \
         so that the display will be neat and attractive on the web."
    )
}

/// Human turn for the narrative model, wrapping the recap sentences.
pub fn build_summary_user_prompt(recap: &str) -> String {
    format!(
        "{recap}\nPlease generate an appealing brief paragraph based on the provided information, \
         formatted in HTML tags such as <p>, <li>, <h1>, etc., so that it can be rendered neatly \
         in a web browser."
    )
}
