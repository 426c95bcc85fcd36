//! Header alias tables.
//!
//! Each target field lists, in priority order, the canonical header keys
//! (see [`crate::parser::canonicalize_header`]) that may carry it. The
//! first alias present in a row wins.

/// Ordered aliases for one target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasSet {
    /// Target field name, as it appears on the record type.
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

impl AliasSet {
    /// First alias among `headers`, if any.
    pub fn resolve_in<'a, I>(&self, headers: I) -> Option<&'static str>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.aliases
            .iter()
            .find(|alias| headers.clone().into_iter().any(|h| h == **alias))
            .copied()
    }
}

/// WEB sales export columns.
pub mod web {
    use super::AliasSet;

    pub const DOC_NUMBER: AliasSet = AliasSet {
        field: "docNumber",
        aliases: &["docnumber", "no", "documentno", "invoiceno", "salesorderno"],
    };
    pub const SKU: AliasSet = AliasSet {
        field: "sku",
        aliases: &["sku", "item", "productsku", "itemcode", "productid"],
    };
    pub const PRODUCT_NAME: AliasSet = AliasSet {
        field: "productName",
        aliases: &["productname", "name", "itemname", "description"],
    };
    pub const QTY: AliasSet = AliasSet {
        field: "qty",
        aliases: &["qty", "quantity"],
    };

    pub const ALL: &[AliasSet] = &[DOC_NUMBER, SKU, PRODUCT_NAME, QTY];
}

/// Accounting (QBO) sales-document export columns.
pub mod accounting {
    use super::AliasSet;

    pub const DATE: AliasSet = AliasSet {
        field: "date",
        aliases: &["date"],
    };
    pub const DOC_TYPE: AliasSet = AliasSet {
        field: "docType",
        aliases: &["type", "transactiontype"],
    };
    pub const DOC_NUMBER: AliasSet = AliasSet {
        field: "docNumber",
        aliases: &["docnumber", "no", "documentno", "num"],
    };
    pub const CUSTOMER: AliasSet = AliasSet {
        field: "customer",
        aliases: &["customer", "client", "billtoname", "name"],
    };
    pub const SKU: AliasSet = AliasSet {
        field: "sku",
        aliases: &["sku", "item", "productsku", "itemcode", "productid", "product"],
    };
    pub const PRODUCT_LABEL: AliasSet = AliasSet {
        field: "productLabel",
        aliases: &["productservicename", "productservice", "product", "item"],
    };
    pub const DESCRIPTION: AliasSet = AliasSet {
        field: "description",
        aliases: &["salesdescription", "description", "memo"],
    };
    pub const QTY: AliasSet = AliasSet {
        field: "qty",
        aliases: &["qty", "quantity"],
    };
    pub const SHIP_TO: AliasSet = AliasSet {
        field: "shipTo",
        aliases: &["shippingto", "shipto"],
    };

    pub const ALL: &[AliasSet] = &[
        DATE,
        DOC_TYPE,
        DOC_NUMBER,
        CUSTOMER,
        SKU,
        PRODUCT_LABEL,
        DESCRIPTION,
        QTY,
        SHIP_TO,
    ];
}

/// Columns of an exported reconciliation report.
pub mod reconciliation {
    use super::AliasSet;

    pub const SKU: AliasSet = AliasSet {
        field: "sku",
        aliases: &["sku"],
    };
    pub const WEB_NAME: AliasSet = AliasSet {
        field: "webName",
        aliases: &["webname", "webproductname"],
    };
    pub const QBO_NAME: AliasSet = AliasSet {
        field: "qboName",
        aliases: &["qboname", "accountingproductname"],
    };
    pub const QBO_DESCRIPTION: AliasSet = AliasSet {
        field: "qboDescription",
        aliases: &["qbodescription", "accountingdescription"],
    };

    pub const ALL: &[AliasSet] = &[SKU, WEB_NAME, QBO_NAME, QBO_DESCRIPTION];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_first_alias_wins() {
        let headers = ["item", "sku", "name"];
        assert_eq!(web::SKU.resolve_in(headers.iter().copied()), Some("sku"));
    }

    #[test]
    fn test_resolve_ignores_column_order() {
        let a = ["productname", "sku", "qty"];
        let b = ["qty", "sku", "productname"];
        assert_eq!(
            web::PRODUCT_NAME.resolve_in(a.iter().copied()),
            web::PRODUCT_NAME.resolve_in(b.iter().copied())
        );
    }

    #[test]
    fn test_resolve_missing() {
        let headers = ["foo", "bar"];
        assert_eq!(accounting::SHIP_TO.resolve_in(headers.iter().copied()), None);
    }

    #[test]
    fn test_accounting_sku_accepts_product_column() {
        assert!(accounting::SKU.aliases.contains(&"product"));
        assert!(!web::SKU.aliases.contains(&"product"));
    }

    #[test]
    fn test_aliases_are_canonical_keys() {
        let tables = [web::ALL, accounting::ALL, reconciliation::ALL];
        for set in tables.iter().flat_map(|t| t.iter()) {
            for alias in set.aliases {
                assert_eq!(*alias, crate::parser::canonicalize_header(alias), "{}", set.field);
            }
        }
    }
}
