use thiserror::Error;

pub const VALID_AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "ca-west-1",
    "eu-north-1",
    "eu-west-3",
    "eu-west-2",
    "eu-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-south-1",
    "eu-south-2",
    "ap-south-1",
    "ap-south-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-east-1",
    "sa-east-1",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "af-south-1",
];

/// CloudFront only accepts viewer certificates issued by ACM in us-east-1.
/// A stack that declares both the certificate and the distribution
/// therefore has to be deployed there.
pub const CLOUDFRONT_CERTIFICATE_REGION: &str = "us-east-1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("Invalid region code {0:?}\nMust be one of {regions:?}", regions = VALID_AWS_REGIONS)]
    Unknown(String),
    #[error("Region {0:?} cannot hold a CloudFront viewer certificate. Deploy this stack to {region}", region = CLOUDFRONT_CERTIFICATE_REGION)]
    NotCertificateRegion(String),
}

pub fn is_valid_region(r: &str) -> bool {
    VALID_AWS_REGIONS.contains(&r)
}

pub fn verify_region(r: &str) -> Result<(), RegionError> {
    if !is_valid_region(r) {
        return Err(RegionError::Unknown(r.to_string()));
    }
    Ok(())
}

pub fn verify_cloudfront_certificate_region(r: &str) -> Result<(), RegionError> {
    verify_region(r)?;
    if r != CLOUDFRONT_CERTIFICATE_REGION {
        return Err(RegionError::NotCertificateRegion(r.to_string()));
    }
    Ok(())
}
