// Sales module - WHO SOLD WHERE
//
// Attribution of outgoing volume into named destination sets, resolved
// back to origin labels.

mod report;

pub use report::{
    CategoryVolume, DestinationSet, SalesAnalyzer, SalesReport, SellerRow, UnresolvedVolume,
};
