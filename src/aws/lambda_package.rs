use super::error::{AwsError, AwsResult};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const HANDLER_FILE: &str = "index.py";
pub const HANDLER: &str = "index.lambda_handler";

/// Stub handler teams replace with their own logic.
pub const STARTER_CODE: &str = r#"def lambda_handler(event, context):
    # TODO: Add your code here
    print("Event:", event)
    return {
        'statusCode': 200,
        'body': 'Lambda function created! Edit this code to add your logic.'
    }
"#;

fn packaging(err: impl std::fmt::Display) -> AwsError {
    AwsError::Packaging(err.to_string())
}

/// Zips the starter handler in memory as a Lambda deployment package.
pub fn starter_package() -> AwsResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer
        .start_file(HANDLER_FILE, options)
        .map_err(packaging)?;
    writer
        .write_all(STARTER_CODE.as_bytes())
        .map_err(packaging)?;
    let cursor = writer.finish().map_err(packaging)?;
    Ok(cursor.into_inner())
}
